//! Per-recipient agent mailboxes.
//!
//! Every (session, recipient) pair owns its own FIFO queue, so a poll only
//! ever sees messages addressed to the polling role.

use crate::types::{AgentMessage, AgentRole};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

struct RecipientQueue {
    sender: mpsc::UnboundedSender<AgentMessage>,
    receiver: Mutex<mpsc::UnboundedReceiver<AgentMessage>>,
}

impl RecipientQueue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

pub struct Mailbox {
    queues: HashMap<AgentRole, RecipientQueue>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    pub fn new() -> Self {
        let queues = AgentRole::ALL
            .into_iter()
            .map(|role| (role, RecipientQueue::new()))
            .collect();
        Self { queues }
    }

    /// Enqueue a message for its recipient. Returns false if the queue is gone.
    pub fn send(&self, message: AgentMessage) -> bool {
        let Some(queue) = self.queues.get(&message.to) else {
            return false;
        };
        debug!(from = %message.from, to = %message.to, kind = %message.message_type, "Mailbox send");
        queue.sender.send(message).is_ok()
    }

    /// Dequeue the oldest message for `recipient`, waiting at most `timeout`.
    pub async fn receive(&self, recipient: AgentRole, timeout: Duration) -> Option<AgentMessage> {
        let queue = self.queues.get(&recipient)?;
        tokio::time::timeout(timeout, async {
            let mut receiver = queue.receiver.lock().await;
            receiver.recv().await
        })
        .await
        .ok()
        .flatten()
    }
}
