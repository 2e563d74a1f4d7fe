//! # Nexus R&D - Multi-agent research orchestration
//!
//! Coordinates a pipeline of research agents that call a language model,
//! record what they find in a shared per-session memory, and hand their
//! output to a verifier and a synthesizer that produce one composite report.
//!
//! ## Overview
//!
//! Nexus can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `nexus-rd` binary
//! 2. **As a library** - Build a [`NexusRuntime`] and call its orchestrator
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use nexus::{NexusRuntime, types::ResearchQuery, utils::toml_config::NexusConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = NexusRuntime::from_config(NexusConfig::default().into_offline())?;
//!     let report = runtime
//!         .orchestrator
//!         .start(ResearchQuery::new("battery recycling"))
//!         .await?;
//!     println!("{}", report.executive_summary.headline);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`llm`] - Model clients and the resilient call wrapper
//! - [`state`] - Session state store, mailboxes and events
//! - [`memory`] - Shared discovery memory
//! - [`agents`] - The research, verification and synthesis agents
//! - [`workflows`] - Phase orchestrator
//! - [`types`] - Common types, the report structure and error handling
//!
//! Every component is an explicit instance; nothing is global, so several
//! runtimes (or tests) can coexist in one process.

/// Research agents and their execution context.
pub mod agents;
/// Command-line interface.
pub mod cli;
/// LLM provider clients and the resilient call wrapper.
pub mod llm;
/// Shared discovery memory.
pub mod memory;
/// Session state store.
pub mod state;
/// Core types (queries, phases, report, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Phase orchestration.
pub mod workflows;

// Re-export commonly used types
pub use agents::{AgentRoster, AgentRosterBuilder};
pub use llm::{LLMClient, Provider, ResilientGenerator};
pub use memory::SharedMemory;
pub use state::SessionStore;
pub use types::{AppError, Result};
pub use utils::toml_config::NexusConfig;
pub use workflows::Orchestrator;

use std::sync::Arc;

/// Every component of a running pipeline, wired from one configuration.
#[derive(Clone)]
pub struct NexusRuntime {
    /// The configuration the runtime was built from
    pub config: Arc<NexusConfig>,
    /// Session state store
    pub store: Arc<SessionStore>,
    /// Shared discovery memory
    pub memory: Arc<SharedMemory>,
    /// Resilient model access shared by all agents
    pub generator: Arc<ResilientGenerator>,
    /// Phase orchestrator
    pub orchestrator: Arc<Orchestrator>,
}

impl NexusRuntime {
    /// Build a runtime with the configured provider.
    pub fn from_config(config: NexusConfig) -> Result<Self> {
        config.validate()?;
        let client = config.provider().create_client()?;
        Self::with_client(config, client)
    }

    /// Build a runtime around an existing client.
    pub fn with_client(config: NexusConfig, client: Arc<dyn LLMClient>) -> Result<Self> {
        tracing::info!(provider = client.provider_name(), model = %config.llm.model, "Building runtime");

        let generator = Arc::new(
            ResilientGenerator::new(client, config.model_roster(), config.retry_policy())
                .with_default_options(config.generate_options()),
        );
        let roster = AgentRoster::with_defaults(generator.clone(), config.verifier_settings());
        Self::with_roster(config, generator, roster)
    }

    /// Build a runtime with a custom agent roster.
    pub fn with_roster(
        config: NexusConfig,
        generator: Arc<ResilientGenerator>,
        roster: AgentRoster,
    ) -> Result<Self> {
        let store = Arc::new(SessionStore::new());
        let memory = Arc::new(SharedMemory::new());
        let orchestrator = Arc::new(
            Orchestrator::new(store.clone(), memory.clone(), roster)
                .with_agent_pause(config.agent_pause())
                .with_mailbox_timeout(config.mailbox_timeout()),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            memory,
            generator,
            orchestrator,
        })
    }
}
