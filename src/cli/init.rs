//! Init command implementation
//!
//! Writes a commented `nexus.toml` plus an `.env.example` naming the API key
//! variable the chosen provider reads.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// nexus.toml already exists
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (gemini, openai or offline)
    pub provider: String,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing Nexus R&D");

    if !matches!(config.provider.as_str(), "gemini" | "openai" | "offline") {
        output.error(&format!("Unknown provider '{}'", config.provider));
        output.hint("Choose one of: gemini, openai, offline");
        return InitResult::Error(format!("unknown provider: {}", config.provider));
    }

    let base_path = &config.path;
    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    let config_path = base_path.join("nexus.toml");
    if config_path.exists() && !config.force {
        output.warning("nexus.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    output.subheader("Creating configuration files");

    if let Err(e) = write_file(&config_path, &generate_nexus_toml(&config), config.force) {
        output.error(&format!("Failed to create nexus.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "nexus.toml");

    if config.provider != "offline" {
        let env_path = base_path.join(".env.example");
        if let Err(e) = write_file(&env_path, &generate_env_example(&config), config.force) {
            output.error(&format!("Failed to create .env.example: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created("env", ".env.example");
    }

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.skipped(".gitignore", "already exists");
    } else if let Err(e) = write_file(&gitignore_path, generate_gitignore(), false) {
        output.warning(&format!("Failed to create .gitignore: {}", e));
    } else {
        output.created("file", ".gitignore");
    }

    output.complete("Nexus R&D initialized successfully!");

    output.header("Next Steps");
    output.newline();
    if config.provider == "offline" {
        output.info("1. Run a research session on demo data:");
    } else {
        output.info("1. Set your API key:");
        output.command("cp .env.example .env");
        output.command(&format!("# Edit .env and set {}", key_env_for(&config.provider)));
        output.newline();
        output.info("2. Run a research session:");
    }
    output.command("nexus-rd research \"solid-state batteries\"");
    output.hint("Without an API key every section falls back to demo data");

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn key_env_for(provider: &str) -> &'static str {
    match provider {
        "openai" => "OPENAI_API_KEY",
        _ => "GEMINI_API_KEY",
    }
}

fn generate_nexus_toml(config: &InitConfig) -> String {
    let (provider_section, model, high_effort_model) = match config.provider.as_str() {
        "openai" => (
            r#"[llm.provider]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1""#,
            "gpt-4o-mini",
            "gpt-4o",
        ),
        "offline" => (
            r#"# Every call is answered with demo data
[llm.provider]
type = "offline""#,
            "gemini-2.0-flash",
            "gemini-2.0-flash-thinking-exp",
        ),
        _ => (
            r#"[llm.provider]
type = "gemini"
api_key_env = "GEMINI_API_KEY""#,
            "gemini-2.0-flash",
            "gemini-2.0-flash-thinking-exp",
        ),
    };

    format!(
        r#"# Nexus R&D configuration
#
# API keys are read from the environment variable named by api_key_env.
# When the variable is unset the pipeline runs on demo data.

[llm]
model = "{model}"
# Used by the verification phase
high_effort_model = "{high_effort_model}"
# Tried when the requested model is unavailable
fallback_model = "{model}"
temperature = 0.7
max_tokens = 8192

{provider_section}

[retry]
# Retries per model after the first attempt
max_retries = 2
# Backoff for unavailable/rate-limited models doubles from this value
base_backoff_ms = 5000
other_error_pause_ms = 2000
success_cooldown_ms = 500

[pipeline]
# Pause between the research agents
agent_pause_ms = 1000
max_claims = 30
min_verification_sources = 5
mailbox_timeout_ms = 30000

[logging]
# Overridden by RUST_LOG
level = "info"
json = false
"#
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    format!(
        r#"# Copy to .env and fill in
{}=your-api-key-here

# Log filter, e.g. nexus=debug
# RUST_LOG=info
"#,
        key_env_for(&config.provider)
    )
}

fn generate_gitignore() -> &'static str {
    r#"# Secrets
.env

# Reports
*.report.json

# Rust
/target
"#
}
