//! TOML-based configuration for Nexus R&D
//!
//! Every field has a default, so an empty `nexus.toml` (or none at all, via
//! [`NexusConfig::default`]) is a working setup. Secrets are never stored in
//! the file: providers name the environment variable holding their API key,
//! and without it every call degrades to demo data.

use crate::agents::VerifierSettings;
use crate::llm::gemini::DEFAULT_GEMINI_BASE_URL;
use crate::llm::openai::DEFAULT_OPENAI_API_BASE;
use crate::llm::{GenerateOptions, ModelRoster, Provider, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from nexus.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NexusConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= LLM Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        /// Environment variable containing API key
        #[serde(default = "default_gemini_key_env")]
        api_key_env: String,
        #[serde(default = "default_gemini_base")]
        base_url: String,
    },
    OpenAI {
        /// Environment variable containing API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
    Offline,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Gemini {
            api_key_env: default_gemini_key_env(),
            base_url: default_gemini_base(),
        }
    }
}

impl ProviderConfig {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Gemini { .. } => "gemini",
            ProviderConfig::OpenAI { .. } => "openai",
            ProviderConfig::Offline => "offline",
        }
    }

    pub fn api_key_env(&self) -> Option<&str> {
        match self {
            ProviderConfig::Gemini { api_key_env, .. }
            | ProviderConfig::OpenAI { api_key_env, .. } => Some(api_key_env.as_str()),
            ProviderConfig::Offline => None,
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_gemini_base() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    DEFAULT_OPENAI_API_BASE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default = "default_model")]
    pub model: String,

    /// Used by verification
    #[serde(default = "default_high_effort_model")]
    pub high_effort_model: String,

    /// Tried when the requested model is unavailable
    #[serde(default = "default_model")]
    pub fallback_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_high_effort_model() -> String {
    "gemini-2.0-flash-thinking-exp".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    8192
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            model: default_model(),
            high_effort_model: default_high_effort_model(),
            fallback_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

// ============= Retry Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    #[serde(default = "default_other_error_pause_ms")]
    pub other_error_pause_ms: u64,

    #[serde(default = "default_success_cooldown_ms")]
    pub success_cooldown_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_backoff_ms() -> u64 {
    5000
}

fn default_other_error_pause_ms() -> u64 {
    2000
}

fn default_success_cooldown_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
            other_error_pause_ms: default_other_error_pause_ms(),
            success_cooldown_ms: default_success_cooldown_ms(),
        }
    }
}

// ============= Pipeline Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Pause between research agents
    #[serde(default = "default_agent_pause_ms")]
    pub agent_pause_ms: u64,

    #[serde(default = "default_max_claims")]
    pub max_claims: usize,

    /// Supporting sources needed for the full source bonus
    #[serde(default = "default_min_verification_sources")]
    pub min_verification_sources: usize,

    #[serde(default = "default_mailbox_timeout_ms")]
    pub mailbox_timeout_ms: u64,
}

fn default_agent_pause_ms() -> u64 {
    1000
}

fn default_max_claims() -> usize {
    30
}

fn default_min_verification_sources() -> usize {
    5
}

fn default_mailbox_timeout_ms() -> u64 {
    30_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            agent_pause_ms: default_agent_pause_ms(),
            max_claims: default_max_claims(),
            min_verification_sources: default_min_verification_sources(),
            mailbox_timeout_ms: default_mailbox_timeout_ms(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    /// Every call will degrade to demo data
    MissingApiKey,
    OfflineProvider,
    /// Worst-case retry sleeping for one call is unusually long
    LongRetryBudget,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

/// Retry budgets above this produce a warning.
const LONG_RETRY_BUDGET: Duration = Duration::from_secs(120);

impl NexusConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: NexusConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let llm = &self.llm;
        for (field, value) in [
            ("model", &llm.model),
            ("high_effort_model", &llm.high_effort_model),
            ("fallback_model", &llm.fallback_model),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "llm.{} must not be empty",
                    field
                )));
            }
        }

        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "llm.temperature must be between 0 and 2, got {}",
                llm.temperature
            )));
        }

        if llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }

        if let Some(env) = llm.provider.api_key_env() {
            if env.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "llm.provider.api_key_env must name an environment variable for provider '{}'",
                    llm.provider.name()
                )));
            }
        }

        if self.retry.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_retries must be at least 1".to_string(),
            ));
        }

        if self.pipeline.max_claims == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_claims must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate configuration and report non-fatal issues
    ///
    /// Returns Ok with warnings, or Err if validation fails
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();

        match self.llm.provider.api_key_env() {
            Some(env) => {
                if self.resolve_env(env).is_none() {
                    warnings.push(ConfigWarning {
                        kind: ConfigWarningKind::MissingApiKey,
                        message: format!(
                            "Environment variable '{}' is not set; every call will use demo data",
                            env
                        ),
                    });
                }
            }
            None => warnings.push(ConfigWarning {
                kind: ConfigWarningKind::OfflineProvider,
                message: "Offline provider configured; every call will use demo data".to_string(),
            }),
        }

        let budget = self.retry_policy().worst_case_delay(self.model_roster().candidates(true).len());
        if budget > LONG_RETRY_BUDGET {
            warnings.push(ConfigWarning {
                kind: ConfigWarningKind::LongRetryBudget,
                message: format!(
                    "A single call may sleep up to {}s while retrying",
                    budget.as_secs()
                ),
            });
        }

        Ok(warnings)
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get the provider API key from the environment
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match self.llm.provider.api_key_env() {
            Some(env) => self
                .resolve_env(env)
                .ok_or_else(|| ConfigError::MissingEnvVar(env.to_string())),
            None => Err(ConfigError::ValidationError(
                "The offline provider has no API key".to_string(),
            )),
        }
    }

    /// Runtime provider. A missing API key falls back to offline mode.
    pub fn provider(&self) -> Provider {
        match &self.llm.provider {
            ProviderConfig::Gemini { base_url, .. } => match self.api_key() {
                Ok(api_key) => Provider::Gemini {
                    api_key,
                    base_url: base_url.clone(),
                },
                Err(_) => Provider::Offline,
            },
            ProviderConfig::OpenAI { api_base, .. } => match self.api_key() {
                Ok(api_key) => Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                },
                Err(_) => Provider::Offline,
            },
            ProviderConfig::Offline => Provider::Offline,
        }
    }

    pub fn model_roster(&self) -> ModelRoster {
        ModelRoster {
            model: self.llm.model.clone(),
            high_effort_model: self.llm.high_effort_model.clone(),
            fallback_model: self.llm.fallback_model.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(self.retry.max_retries)
            .with_base_backoff(Duration::from_millis(self.retry.base_backoff_ms))
            .with_other_error_pause(Duration::from_millis(self.retry.other_error_pause_ms))
            .with_success_cooldown(Duration::from_millis(self.retry.success_cooldown_ms))
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions::default()
            .with_temperature(self.llm.temperature)
            .with_max_tokens(self.llm.max_tokens)
    }

    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            max_claims: self.pipeline.max_claims,
            min_sources: self.pipeline.min_verification_sources,
        }
    }

    pub fn agent_pause(&self) -> Duration {
        Duration::from_millis(self.pipeline.agent_pause_ms)
    }

    pub fn mailbox_timeout(&self) -> Duration {
        Duration::from_millis(self.pipeline.mailbox_timeout_ms)
    }

    /// Force offline mode regardless of the configured provider
    pub fn into_offline(mut self) -> Self {
        self.llm.provider = ProviderConfig::Offline;
        self
    }
}
