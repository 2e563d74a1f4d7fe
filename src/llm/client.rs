//! LLM client abstractions and provider management
//!
//! This module provides a unified interface over the model providers the
//! pipeline can talk to:
//! - **Gemini**: REST `generateContent` endpoint
//! - **OpenAI**: any OpenAI-compatible `/chat/completions` endpoint
//! - **Offline**: never reaches a model, so every call degrades to demo data

use crate::llm::gemini::GeminiClient;
use crate::llm::openai::OpenAIClient;
use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============= Failure Classification =============

/// How the retry loop should react to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    /// The model is overloaded or down; move to the next candidate model.
    Unavailable,
    /// Quota or rate limit hit; back off exponentially and retry.
    RateLimited,
    /// Anything else; pause briefly and retry.
    Other,
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LlmErrorKind::Unavailable => "unavailable",
            LlmErrorKind::RateLimited => "rate_limited",
            LlmErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

const UNAVAILABLE_MARKERS: &[&str] = &["unavailable", "overloaded", "503"];
const RATE_LIMIT_MARKERS: &[&str] = &[
    "resource_exhausted",
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota",
    "429",
];

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimited, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Other, message)
    }

    /// Classify a failure from its message text alone.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let kind = if UNAVAILABLE_MARKERS.iter().any(|m| lower.contains(m)) {
            LlmErrorKind::Unavailable
        } else if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
            LlmErrorKind::RateLimited
        } else {
            LlmErrorKind::Other
        };
        Self::new(kind, message)
    }

    /// Classify an HTTP error response. The status code wins over the body.
    pub fn from_http(status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body);
        match status {
            503 => Self::unavailable(message),
            429 => Self::rate_limited(message),
            _ => Self::classify(message),
        }
    }
}

// ============= Requests =============

/// What a generation call is for. Each category carries its own system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    PatentAnalysis,
    MarketAnalysis,
    TechTrend,
    Verification,
    Synthesis,
    Whitespace,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::PatentAnalysis => "patent_analysis",
            TaskCategory::MarketAnalysis => "market_analysis",
            TaskCategory::TechTrend => "tech_trend",
            TaskCategory::Verification => "verification",
            TaskCategory::Synthesis => "synthesis",
            TaskCategory::Whitespace => "whitespace",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            TaskCategory::PatentAnalysis => {
                "You are an expert patent analyst. Map the patent landscape, identify dominant \
                 assignees, citation clusters and areas with little patent activity. \
                 Respond with JSON only."
            }
            TaskCategory::MarketAnalysis => {
                "You are a market intelligence analyst. Assess market size, key players, \
                 startup funding and regulatory signals. Respond with JSON only."
            }
            TaskCategory::TechTrend => {
                "You are a technology trend analyst. Identify emerging research themes, \
                 technology readiness and leading research groups. Respond with JSON only."
            }
            TaskCategory::Verification => {
                "You are a rigorous fact checker. For every claim, list supporting and \
                 contradicting sources and give a confidence between 0 and 1. \
                 Respond with JSON only."
            }
            TaskCategory::Synthesis => {
                "You are a strategy consultant. Combine the findings into a concise executive \
                 summary with ranked innovation opportunities. Respond with JSON only."
            }
            TaskCategory::Whitespace => {
                "You identify innovation whitespace: unmet needs where patents, products and \
                 research leave a gap. Respond with JSON only."
            }
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub category: TaskCategory,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            prompt: prompt.into(),
            category,
            temperature: 0.7,
            max_tokens: 8192,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// System prompt and user prompt joined the way single-turn providers expect.
    pub fn full_prompt(&self) -> String {
        format!("{}\n\n{}", self.category.system_prompt(), self.prompt)
    }
}

// ============= Client Trait =============

/// Generic LLM client trait for provider abstraction
///
/// A client performs exactly one call per invocation. Retries, model
/// fallback and demo degradation live in
/// [`ResilientGenerator`](crate::llm::ResilientGenerator).
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion with the given model.
    async fn generate(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError>;

    /// Provider name used in logs.
    fn provider_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini { api_key: String, base_url: String },
    OpenAI { api_key: String, api_base: String },
    Offline,
}

impl Provider {
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::Gemini { api_key, base_url } => {
                Ok(Arc::new(GeminiClient::new(api_key.clone(), base_url.clone())?))
            }
            Provider::OpenAI { api_key, api_base } => {
                Ok(Arc::new(OpenAIClient::new(api_key.clone(), api_base.clone())?))
            }
            Provider::Offline => Ok(Arc::new(OfflineClient)),
        }
    }
}

/// Client that never reaches a model. Every call reports the model as
/// unavailable so callers fall through to their demo payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineClient;

#[async_trait]
impl LLMClient for OfflineClient {
    async fn generate(
        &self,
        model: &str,
        _request: &GenerationRequest,
    ) -> std::result::Result<String, LlmError> {
        Err(LlmError::unavailable(format!(
            "offline mode: model {} is not reachable",
            model
        )))
    }

    fn provider_name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("503 UNAVAILABLE: the model is overloaded", LlmErrorKind::Unavailable)]
    #[case("Model is overloaded, try later", LlmErrorKind::Unavailable)]
    #[case("429 RESOURCE_EXHAUSTED", LlmErrorKind::RateLimited)]
    #[case("Quota exceeded for project", LlmErrorKind::RateLimited)]
    #[case("invalid argument: prompt too long", LlmErrorKind::Other)]
    fn test_classify_message(#[case] message: &str, #[case] expected: LlmErrorKind) {
        assert_eq!(LlmError::classify(message).kind, expected);
    }

    #[test]
    fn test_from_http_status_wins() {
        assert_eq!(
            LlmError::from_http(503, "whatever").kind,
            LlmErrorKind::Unavailable
        );
        assert_eq!(
            LlmError::from_http(429, "slow down").kind,
            LlmErrorKind::RateLimited
        );
        assert_eq!(
            LlmError::from_http(400, "bad request").kind,
            LlmErrorKind::Other
        );
        assert_eq!(
            LlmError::from_http(500, "backend overloaded").kind,
            LlmErrorKind::Unavailable
        );
    }

    #[test]
    fn test_full_prompt_prefixes_system_prompt() {
        let req = GenerationRequest::new("Analyze X", TaskCategory::PatentAnalysis);
        let full = req.full_prompt();
        assert!(full.starts_with(TaskCategory::PatentAnalysis.system_prompt()));
        assert!(full.ends_with("Analyze X"));
    }

    #[tokio::test]
    async fn test_offline_client_is_unavailable() {
        let client = Provider::Offline.create_client().unwrap();
        let err = client
            .generate("m", &GenerationRequest::new("p", TaskCategory::Synthesis))
            .await
            .unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Unavailable);
        assert_eq!(client.provider_name(), "offline");
    }
}
