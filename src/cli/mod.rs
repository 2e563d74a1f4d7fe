//! CLI module for Nexus R&D
//!
//! Provides command-line interface parsing and handling for the nexus-rd binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Nexus R&D - Multi-agent innovation research
///
/// Runs patent, market and technology-trend research agents over one query,
/// verifies their claims and synthesizes a ranked opportunity report.
#[derive(Parser, Debug)]
#[command(
    name = "nexus-rd",
    version,
    about = "Nexus R&D - Multi-agent innovation research",
    long_about = "Runs patent, market and technology-trend research agents over one query,\n\
                  verifies their claims and synthesizes a ranked opportunity report.\n\n\
                  Without an API key every model call degrades to demo data, so the\n\
                  pipeline always produces a report.",
    after_help = "EXAMPLES:\n    \
                  nexus-rd init                                  # Write a default nexus.toml\n    \
                  nexus-rd research \"solid-state batteries\"       # Run the full pipeline\n    \
                  nexus-rd research \"grid storage\" --offline      # Demo data only\n    \
                  nexus-rd research \"heat pumps\" --json > r.json  # Machine-readable report\n    \
                  nexus-rd config --validate                     # Check nexus.toml"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "nexus.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the research pipeline for a query
    Research {
        /// Technology or problem statement to research
        query: String,

        /// Narrows the research focus (e.g. "energy storage")
        #[arg(short, long)]
        domain: Option<String>,

        /// Print the full report as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Write the full JSON report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Never call a model; use demo data for every section
        #[arg(long)]
        offline: bool,
    },

    /// Write a default nexus.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (gemini, openai or offline)
        #[arg(long, default_value = "gemini")]
        provider: String,
    },

    /// Show configuration information
    Config {
        /// Show the full configuration as TOML
        #[arg(short = 'f', long)]
        full: bool,

        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
