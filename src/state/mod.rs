//! Session State Store
//!
//! Tracks every research session: its phase, the runtime state of each agent
//! role, a per-recipient mailbox for agent-to-agent messages, and the events
//! emitted as any of these change.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexus::state::{AgentStatusUpdate, SessionStore};
//! use nexus::types::{AgentRole, AgentStatus, ResearchQuery};
//!
//! let store = SessionStore::new();
//! let session = store.create_session(ResearchQuery::new("battery recycling")).await;
//! store
//!     .update_agent_status(
//!         &session.session_id,
//!         AgentRole::PatentScout,
//!         AgentStatusUpdate::new(AgentStatus::Running).progress(10.0),
//!     )
//!     .await?;
//! let summary = store.get_session_summary(&session.session_id);
//! ```

pub mod events;
pub mod mailbox;
pub mod session;
pub mod store;

pub use events::{EventBus, EventHandler, FnHandler, SessionEvent, SessionEventKind};
pub use mailbox::Mailbox;
pub use session::{AgentState, AgentStatusUpdate, AgentSummary, Session, SessionSummary};
pub use store::SessionStore;
