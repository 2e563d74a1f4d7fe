//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for generating text with a
//! language model, plus the resilience layer every agent call goes through.
//!
//! # Architecture
//!
//! - [`LLMClient`] - One call against one model, failures classified by [`LlmErrorKind`]
//! - [`Provider`] - Runtime provider selection and client construction
//! - [`ResilientGenerator`] - Model fallback, classified retries, cooldown, demo degradation
//! - [`demo`] - Deterministic payloads used when a live call cannot be used
//!
//! # Example
//!
//! ```ignore
//! use nexus::llm::{GenerateOptions, ModelRoster, Provider, ResilientGenerator, RetryPolicy, TaskCategory};
//!
//! let client = Provider::Offline.create_client()?;
//! let generator = ResilientGenerator::new(client, ModelRoster::default(), RetryPolicy::default());
//! let payload = generator
//!     .generate_json_or_demo("Assess the market", TaskCategory::MarketAnalysis, &GenerateOptions::default(), || serde_json::json!({}))
//!     .await;
//! assert!(payload.is_degraded());
//! ```

/// Core LLM client trait, failure classification and provider selection.
pub mod client;
/// Deterministic demo payloads.
pub mod demo;
/// Gemini REST client.
pub mod gemini;
/// OpenAI-compatible chat completions client.
pub mod openai;
/// Retry, fallback and degradation wrapper.
pub mod resilient;

pub use client::{
    GenerationRequest, LLMClient, LlmError, LlmErrorKind, OfflineClient, Provider, TaskCategory,
};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use resilient::{
    parse_json_payload, GenerateOptions, GeneratorStatsSnapshot, ModelRoster, ResilientGenerator,
    RetryPolicy,
};
