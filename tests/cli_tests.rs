//! CLI Integration Tests for nexus-rd
//!
//! Runs the built binary for the init, config and research commands.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run nexus-rd with arguments inside `working_dir`
fn run_nexus(args: &[&str], working_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nexus-rd"))
        .args(args)
        .current_dir(working_dir)
        .env("RUST_LOG", "off")
        .env_remove("GEMINI_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .output()
        .expect("Failed to execute nexus-rd")
}

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("nexus.toml");
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_nexus(&["--help"], temp_dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Nexus R&D"));
    assert!(stdout.contains("research"));
    assert!(stdout.contains("init"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_version_command() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_nexus(&["--version"], temp_dir.path());

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("nexus-rd"));
}

#[test]
fn test_research_requires_query() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_nexus(&["research"], temp_dir.path());
    assert!(!output.status.success());
}

// =============================================================================
// Init Command Tests
// =============================================================================

#[test]
fn test_init_creates_nexus_toml() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_nexus(&["--no-color", "init"], temp_dir.path());

    assert!(output.status.success());
    let content = fs::read_to_string(temp_dir.path().join("nexus.toml")).unwrap();
    assert!(content.contains("[llm]"));
    assert!(content.contains("[pipeline]"));
    assert!(temp_dir.path().join(".env.example").exists());
}

#[test]
fn test_init_keeps_existing_without_force() {
    let temp_dir = TempDir::new().unwrap();
    write_config(&temp_dir, "# hand-written\n");

    let output = run_nexus(&["--no-color", "init"], temp_dir.path());
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("already exists"));
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("nexus.toml")).unwrap(),
        "# hand-written\n"
    );

    let output = run_nexus(&["--no-color", "init", "--force"], temp_dir.path());
    assert!(output.status.success());
    assert!(fs::read_to_string(temp_dir.path().join("nexus.toml"))
        .unwrap()
        .contains("[retry]"));
}

#[test]
fn test_init_rejects_unknown_provider() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_nexus(&["--no-color", "init", "--provider", "ollama"], temp_dir.path());
    assert!(!output.status.success());
}

// =============================================================================
// Config Command Tests
// =============================================================================

#[test]
fn test_config_validate_reports_missing_key() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[llm.provider]\ntype = \"gemini\"\n");

    let output = run_nexus(
        &["--no-color", "--config", &config, "config", "--validate"],
        temp_dir.path(),
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("GEMINI_API_KEY"));
    assert!(stdout.contains("valid"));
}

#[test]
fn test_config_rejects_invalid_values() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[llm]\ntemperature = 5.0\n");

    let output = run_nexus(&["--config", &config, "config"], temp_dir.path());

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("temperature"));
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let output = run_nexus(&["--no-color", "config", "--full"], temp_dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("not found, using defaults"));
    assert!(stdout.contains("gemini-2.0-flash"));
}

// =============================================================================
// Research Command Tests
// =============================================================================

#[test]
fn test_research_offline_json() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[pipeline]\nagent_pause_ms = 0\n");

    let output = run_nexus(
        &[
            "--config",
            &config,
            "research",
            "solid-state batteries",
            "--domain",
            "energy storage",
            "--offline",
            "--json",
        ],
        temp_dir.path(),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["report_id"].as_str().unwrap().starts_with("IOR-"));
    assert_eq!(report["query"]["query"], "solid-state batteries");
    assert_eq!(report["sections"]["patent_landscape"]["provenance"], "degraded");
}

#[test]
fn test_research_writes_report_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir, "[pipeline]\nagent_pause_ms = 0\n");

    let output = run_nexus(
        &[
            "--no-color",
            "--config",
            &config,
            "research",
            "heat pumps",
            "--offline",
            "--output",
            "heat.report.json",
        ],
        temp_dir.path(),
    );

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Research complete"));
    assert!(stdout.contains("Demo data used for"));

    let saved = fs::read_to_string(temp_dir.path().join("heat.report.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(report["query"]["query"], "heat pumps");
}
