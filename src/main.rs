//! Nexus R&D CLI Entry Point
//!
//! - `nexus-rd research <query>` - Run the full research pipeline
//! - `nexus-rd init` - Write a default nexus.toml
//! - `nexus-rd config` - Show or validate the configuration

use anyhow::Context;
use nexus::cli::init::{self, InitConfig, InitResult};
use nexus::cli::output::Output;
use nexus::cli::{Cli, Commands};
use nexus::state::{SessionEvent, SessionEventKind};
use nexus::types::{AgentRole, Report, ResearchPhase, ResearchQuery};
use nexus::utils::toml_config::{LoggingConfig, NexusConfig};
use nexus::NexusRuntime;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PRINTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Commands::Init {
            path,
            force,
            provider,
        } => {
            let result = init::run(
                InitConfig {
                    path,
                    force,
                    provider,
                },
                &output,
            );
            match result {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(message) => anyhow::bail!(message),
            }
        }
        Commands::Config { full, validate } => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.logging, cli.verbose);
            show_config(&cli.config, &config, full, validate, &output)
        }
        Commands::Research {
            query,
            domain,
            json,
            output: report_path,
            offline,
        } => {
            let mut config = load_config(&cli.config)?;
            if offline {
                config = config.into_offline();
            }
            init_tracing(&config.logging, cli.verbose);

            let mut query = ResearchQuery::new(query);
            if let Some(domain) = domain {
                query = query.with_domain(domain);
            }
            research(config, query, json, report_path.as_deref(), &output).await
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<NexusConfig> {
    NexusConfig::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Initialize tracing. `RUST_LOG` wins over the configured level and
/// `--verbose` raises the default to debug. Logs go to stderr.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn show_config(
    path: &Path,
    config: &NexusConfig,
    full: bool,
    validate: bool,
    output: &Output,
) -> anyhow::Result<()> {
    output.header("Configuration");
    if path.exists() {
        output.kv("File", &path.display().to_string());
    } else {
        output.kv("File", &format!("{} (not found, using defaults)", path.display()));
    }
    output.kv("Provider", config.llm.provider.name());
    output.kv("Model", &config.llm.model);
    output.kv("High-effort model", &config.llm.high_effort_model);
    output.kv("Fallback model", &config.llm.fallback_model);
    output.kv("Max retries", &config.retry.max_retries.to_string());
    output.kv("Max claims", &config.pipeline.max_claims.to_string());

    if full {
        output.subheader("nexus.toml");
        let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
        for line in rendered.lines() {
            println!("    {}", line);
        }
    }

    if validate {
        output.subheader("Validation");
        let warnings = config.validate_with_warnings()?;
        if warnings.is_empty() {
            output.success("Configuration is valid");
        } else {
            for warning in &warnings {
                output.warning(&warning.to_string());
            }
            output.success("Configuration is valid (with warnings)");
        }
    }
    Ok(())
}

async fn research(
    config: NexusConfig,
    query: ResearchQuery,
    json: bool,
    report_path: Option<&Path>,
    output: &Output,
) -> anyhow::Result<()> {
    if let Ok(warnings) = config.validate_with_warnings() {
        for warning in warnings {
            tracing::warn!("{}", warning);
        }
    }

    let runtime = NexusRuntime::from_config(config)?;

    let printer = if json {
        None
    } else {
        output.banner();
        output.header(&format!("Researching: {}", query.focus()));
        let events = runtime.store.subscribe();
        let colored = output.colored;
        Some(tokio::spawn(print_progress(events, colored)))
    };

    let result = runtime.orchestrator.start(query).await;

    if let Some(handle) = printer {
        // The printer stops at the completion event; don't wait on it if that was missed
        if tokio::time::timeout(PRINTER_DRAIN_TIMEOUT, handle).await.is_err() {
            tracing::debug!("Progress printer did not finish");
        }
    }
    let report = result?;

    if let Some(path) = report_path {
        let content = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, output);
        if let Some(path) = report_path {
            output.created("report", &path.display().to_string());
        }
    }
    Ok(())
}

async fn print_progress(mut events: broadcast::Receiver<SessionEvent>, colored: bool) {
    let output = if colored {
        Output::new()
    } else {
        Output::no_color()
    };

    loop {
        match events.recv().await {
            Ok(event) => match event.kind {
                SessionEventKind::PhaseUpdated => {
                    if let Ok(phase) =
                        serde_json::from_value::<ResearchPhase>(event.data["phase"].clone())
                    {
                        output.subheader(&phase.to_string());
                    }
                }
                SessionEventKind::AgentStatusUpdated => {
                    let agent = serde_json::from_value::<AgentRole>(event.data["agent"].clone())
                        .map(|role| role.display_name().to_string())
                        .unwrap_or_else(|_| "agent".to_string());
                    let percent = event.data["progress"].as_f64().unwrap_or(0.0) as f32;
                    let task = event.data["task"].as_str().unwrap_or_default();
                    match event.data["error"].as_str() {
                        Some(error) => output.warning(&format!("{}: {}", agent, error)),
                        None => output.progress(&agent, percent, task),
                    }
                }
                SessionEventKind::SessionCompleted => break,
                SessionEventKind::SessionCreated => {}
            },
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "Progress printer lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_report(report: &Report, output: &Output) {
    let summary = &report.executive_summary;

    output.header(&summary.headline);
    output.kv("Report", &report.report_id);
    output.kv("Session", &report.session_id);
    output.kv(
        "Confidence",
        &format!("{:.0}%", summary.overall_confidence * 100.0),
    );
    if !summary.key_finding.is_empty() {
        output.kv("Key finding", &summary.key_finding);
    }

    if !report.opportunities.is_empty() {
        output.subheader("Opportunities");
        output.table_header(&["Rank", "Confidence", "Impact", "Opportunity"]);
        for opportunity in &report.opportunities {
            output.table_row(&[
                &opportunity.rank.to_string(),
                &format!("{:.2}", opportunity.confidence_score),
                &opportunity.potential_impact,
                &opportunity.title,
            ]);
        }
    }

    if !report.recommendations.is_empty() {
        output.subheader("Recommendations");
        for rec in &report.recommendations {
            output.list_item(&format!(
                "{}. {} ({})",
                rec.priority, rec.recommendation, rec.timeline
            ));
        }
    }

    if !report.competitive_threats.is_empty() {
        output.subheader("Competitive threats");
        for threat in &report.competitive_threats {
            output.list_item(&format!("{} [{}]", threat.entity, threat.threat_level));
        }
    }

    let verification = &report.verification;
    output.subheader("Verification");
    output.kv(
        "Claims",
        &format!(
            "{} analyzed, {} unverified",
            verification.total_claims_analyzed,
            verification.unverified_claims.len()
        ),
    );
    output.kv(
        "Coverage",
        &format!("{:.0}%", verification.verification_coverage * 100.0),
    );

    let metadata = &report.metadata;
    output.subheader("Run");
    output.kv(
        "Sources analyzed",
        &metadata.total_sources_analyzed.to_string(),
    );
    output.kv(
        "Processing time",
        &format!("{:.1}s", metadata.processing_time_seconds),
    );
    if !metadata.degraded_sections.is_empty() {
        output.warning(&format!(
            "Demo data used for: {}",
            metadata.degraded_sections.join(", ")
        ));
    }

    output.complete("Research complete");
}
