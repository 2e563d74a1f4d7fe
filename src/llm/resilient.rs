//! Resilient LLM call wrapper
//!
//! Wraps a single [`LLMClient`] with model fallback, classified retries and a
//! post-success cooldown.
//!
//! # Retry behaviour
//!
//! For each candidate model (requested model, then the fallback model if it
//! differs) up to `max_retries` attempts are made:
//!
//! - **Unavailable**: abandon this model immediately and try the next one.
//! - **RateLimited**: pause `base_backoff * 2^(n-1)` before retry `n`.
//! - **Other**: pause a flat `other_error_pause` before retrying.
//!
//! When every candidate is exhausted the last observed failure is returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexus::llm::{GenerateOptions, ModelRoster, ResilientGenerator, RetryPolicy, TaskCategory};
//!
//! let generator = ResilientGenerator::new(client, ModelRoster::default(), RetryPolicy::default());
//! let text = generator
//!     .generate("Map the patent landscape", TaskCategory::PatentAnalysis, &GenerateOptions::default())
//!     .await?;
//! ```

use crate::llm::client::{GenerationRequest, LLMClient, LlmError, LlmErrorKind, TaskCategory};
use crate::types::{AppError, Result, Sourced};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Retry and pacing configuration for [`ResilientGenerator`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per candidate model (default: 2, values below 1 count as 1)
    pub max_retries: u32,

    /// First rate-limit backoff; doubles on every further retry (default: 5 seconds)
    pub base_backoff: Duration,

    /// Flat pause after an unclassified failure (default: 2 seconds)
    pub other_error_pause: Duration,

    /// Pause after a successful call (default: 500 ms)
    pub success_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff: Duration::from_secs(5),
            other_error_pause: Duration::from_secs(2),
            success_cooldown: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn with_other_error_pause(mut self, pause: Duration) -> Self {
        self.other_error_pause = pause;
        self
    }

    pub fn with_success_cooldown(mut self, cooldown: Duration) -> Self {
        self.success_cooldown = cooldown;
        self
    }

    /// Zero every pause (useful for testing)
    pub fn without_delays(self) -> Self {
        self.with_base_backoff(Duration::ZERO)
            .with_other_error_pause(Duration::ZERO)
            .with_success_cooldown(Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Pause before retry `retry` (1-based) after a rate-limit failure.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1u32 << exponent)
    }

    /// Upper bound on the time one `generate` call can spend sleeping,
    /// given the number of candidate models.
    pub fn worst_case_delay(&self, candidate_models: usize) -> Duration {
        let per_model: Duration = (1..self.attempts())
            .map(|retry| self.backoff_for(retry).max(self.other_error_pause))
            .sum();
        per_model.saturating_mul(candidate_models as u32) + self.success_cooldown
    }
}

/// Model names used by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRoster {
    pub model: String,
    /// Used when a call asks for high effort (verification, synthesis).
    pub high_effort_model: String,
    pub fallback_model: String,
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            high_effort_model: "gemini-2.0-flash-thinking-exp".to_string(),
            fallback_model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl ModelRoster {
    pub fn single(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            high_effort_model: model.clone(),
            fallback_model: model.clone(),
            model,
        }
    }

    /// Ordered candidate list: requested model, then fallback if distinct.
    pub fn candidates(&self, high_effort: bool) -> Vec<&str> {
        let primary = if high_effort {
            self.high_effort_model.as_str()
        } else {
            self.model.as_str()
        };
        let mut models = vec![primary];
        if self.fallback_model != primary {
            models.push(self.fallback_model.as_str());
        }
        models
    }
}

/// Per-call knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub high_effort: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Overrides the policy's `max_retries` for this call.
    pub max_retries: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            high_effort: false,
            temperature: 0.7,
            max_tokens: 8192,
            max_retries: None,
        }
    }
}

impl GenerateOptions {
    pub fn high_effort() -> Self {
        Self {
            high_effort: true,
            ..Self::default()
        }
    }

    pub fn with_high_effort(mut self) -> Self {
        self.high_effort = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Counters exposed for observability.
#[derive(Debug, Default)]
pub struct GeneratorStats {
    calls: AtomicU64,
    successes: AtomicU64,
    retries: AtomicU64,
    model_fallbacks: AtomicU64,
    degraded: AtomicU64,
}

/// Point-in-time copy of [`GeneratorStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStatsSnapshot {
    pub calls: u64,
    pub successes: u64,
    pub retries: u64,
    pub model_fallbacks: u64,
    pub degraded: u64,
}

impl GeneratorStats {
    pub fn snapshot(&self) -> GeneratorStatsSnapshot {
        GeneratorStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            model_fallbacks: self.model_fallbacks.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

pub struct ResilientGenerator {
    client: Arc<dyn LLMClient>,
    models: ModelRoster,
    policy: RetryPolicy,
    defaults: GenerateOptions,
    stats: GeneratorStats,
}

impl ResilientGenerator {
    pub fn new(client: Arc<dyn LLMClient>, models: ModelRoster, policy: RetryPolicy) -> Self {
        Self {
            client,
            models,
            policy,
            defaults: GenerateOptions::default(),
            stats: GeneratorStats::default(),
        }
    }

    /// Set the sampling options callers start from.
    pub fn with_default_options(mut self, defaults: GenerateOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Configured default options, to be adjusted per call.
    pub fn options(&self) -> GenerateOptions {
        self.defaults.clone()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn models(&self) -> &ModelRoster {
        &self.models
    }

    pub fn stats(&self) -> GeneratorStatsSnapshot {
        self.stats.snapshot()
    }

    /// Generate text, retrying and falling back per the policy.
    pub async fn generate(
        &self,
        prompt: &str,
        category: TaskCategory,
        options: &GenerateOptions,
    ) -> Result<String> {
        self.stats.calls.fetch_add(1, Ordering::Relaxed);

        let request = GenerationRequest::new(prompt, category)
            .with_temperature(options.temperature)
            .with_max_tokens(options.max_tokens);
        let attempts = options
            .max_retries
            .unwrap_or(self.policy.max_retries)
            .max(1);
        let candidates = self.models.candidates(options.high_effort);

        let mut last_error: Option<LlmError> = None;

        for (index, model) in candidates.iter().enumerate() {
            if index > 0 {
                self.stats.model_fallbacks.fetch_add(1, Ordering::Relaxed);
                info!(model, category = %category, "Falling back to next model");
            }

            let mut pause: Option<Duration> = None;
            for attempt in 1..=attempts {
                if let Some(delay) = pause.take() {
                    self.stats.retries.fetch_add(1, Ordering::Relaxed);
                    debug!(model, attempt, ?delay, "Pausing before retry");
                    tokio::time::sleep(delay).await;
                }

                match self.client.generate(model, &request).await {
                    Ok(text) => {
                        self.stats.successes.fetch_add(1, Ordering::Relaxed);
                        debug!(model, attempt, category = %category, "Generation succeeded");
                        if !self.policy.success_cooldown.is_zero() {
                            tokio::time::sleep(self.policy.success_cooldown).await;
                        }
                        return Ok(text);
                    }
                    Err(err) => {
                        match err.kind {
                            LlmErrorKind::Unavailable => {
                                warn!(model, attempt, error = %err, "Model unavailable");
                                last_error = Some(err);
                                break;
                            }
                            LlmErrorKind::RateLimited => {
                                warn!(model, attempt, error = %err, "Rate limited");
                                pause = Some(self.policy.backoff_for(attempt));
                            }
                            LlmErrorKind::Other => {
                                error!(model, attempt, error = %err, "Generation failed");
                                pause = Some(self.policy.other_error_pause);
                            }
                        }
                        last_error = Some(err);
                    }
                }
            }
        }

        Err(AppError::Llm(last_error.unwrap_or_else(|| {
            LlmError::other("no candidate models configured")
        })))
    }

    /// Generate and parse a JSON payload, degrading to `demo()` when the
    /// call fails or the response is not JSON.
    pub async fn generate_json_or_demo<F>(
        &self,
        prompt: &str,
        category: TaskCategory,
        options: &GenerateOptions,
        demo: F,
    ) -> Sourced<Value>
    where
        F: FnOnce() -> Value,
    {
        match self.generate(prompt, category, options).await {
            Ok(text) => match parse_json_payload(&text) {
                Some(value) => Sourced::Live(value),
                None => {
                    self.stats.degraded.fetch_add(1, Ordering::Relaxed);
                    warn!(category = %category, "Model response was not JSON, using demo data");
                    Sourced::Degraded(demo())
                }
            },
            Err(e) => {
                self.stats.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(category = %category, error = %e, "Generation failed, using demo data");
                Sourced::Degraded(demo())
            }
        }
    }
}

/// Extract a JSON value from model output, tolerating markdown fences and
/// prose around the object.
pub fn parse_json_payload(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(20));
    }

    #[test]
    fn test_attempts_floor_is_one() {
        assert_eq!(RetryPolicy::default().with_max_retries(0).attempts(), 1);
    }

    #[test]
    fn test_worst_case_delay_default() {
        // one pause of max(5s, 2s) per model, two models, plus cooldown
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.worst_case_delay(2),
            Duration::from_secs(10) + Duration::from_millis(500)
        );
    }

    #[test]
    fn test_candidates_skip_duplicate_fallback() {
        let roster = ModelRoster::single("m");
        assert_eq!(roster.candidates(false), vec!["m"]);

        let roster = ModelRoster {
            model: "fast".into(),
            high_effort_model: "deep".into(),
            fallback_model: "fast".into(),
        };
        assert_eq!(roster.candidates(false), vec!["fast"]);
        assert_eq!(roster.candidates(true), vec!["deep", "fast"]);
    }

    #[test]
    fn test_parse_json_payload_variants() {
        assert_eq!(parse_json_payload("{\"a\":1}").unwrap()["a"], 1);
        assert_eq!(
            parse_json_payload("```json\n{\"a\": 2}\n```").unwrap()["a"],
            2
        );
        assert_eq!(
            parse_json_payload("Here you go: {\"a\": 3} hope it helps").unwrap()["a"],
            3
        );
        assert!(parse_json_payload("").is_none());
        assert!(parse_json_payload("no json here").is_none());
    }
}
