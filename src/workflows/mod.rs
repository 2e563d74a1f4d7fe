//! Phase orchestration for research sessions.
//!
//! # Usage
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(store, memory, roster)
//!     .with_agent_pause(Duration::from_millis(500));
//! let report = orchestrator.start(ResearchQuery::new("battery recycling")).await?;
//! println!("{}", report.executive_summary.headline);
//! ```

pub mod orchestrator;

pub use orchestrator::{Orchestrator, DEFAULT_AGENT_PAUSE};
