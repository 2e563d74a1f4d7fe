//! Shared discovery memory for research sessions.
//!
//! This module provides:
//! - [`SharedMemory`], the per-session ledger agents write findings into
//! - Record types for discoveries, verified facts, whitespace hints,
//!   tracked entities, citation edges and research paths
//! - Helpers for formatting recorded findings into prompts

pub mod records;
pub mod shared;

pub use records::{
    CitationLink, Discovery, Entity, MemorySnapshot, ResearchPath, SessionMemory, VerifiedFact,
    WhitespaceHint,
};
pub use shared::{MemoryStats, SharedMemory};

/// Maximum number of discoveries to include in a prompt to avoid token overflow.
pub const MAX_DISCOVERIES_IN_PROMPT: usize = 20;

/// Maximum number of whitespace hints to include in a prompt.
pub const MAX_HINTS_IN_PROMPT: usize = 10;

/// Formats a session's confident discoveries and whitespace hints for
/// inclusion in a prompt.
///
/// Returns an empty string when nothing qualifies.
///
/// # Example
/// ```ignore
/// let context = format_memory_for_prompt(&memory, &session_id);
/// // context: "Discoveries so far:\n- [patent_scout] Filings grew 34%\n\nWhitespace hints:\n- ..."
/// ```
pub fn format_memory_for_prompt(memory: &SharedMemory, session_id: &str) -> String {
    let mut parts = Vec::new();

    let discoveries: Vec<String> = memory
        .get_discoveries(session_id, None, 0.5)
        .iter()
        .take(MAX_DISCOVERIES_IN_PROMPT)
        .map(|d| match d.text() {
            Some(text) => format!("- [{}] {}", d.source, text),
            None => format!("- [{}] {}", d.source, d.content),
        })
        .collect();
    if !discoveries.is_empty() {
        parts.push(format!("Discoveries so far:\n{}", discoveries.join("\n")));
    }

    let hints: Vec<String> = memory
        .get_whitespace_hints(session_id)
        .iter()
        .take(MAX_HINTS_IN_PROMPT)
        .map(|h| format!("- {} (from {})", h.hint, h.agent))
        .collect();
    if !hints.is_empty() {
        parts.push(format!("Whitespace hints:\n{}", hints.join("\n")));
    }

    parts.join("\n\n")
}
