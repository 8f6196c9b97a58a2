//! CLI command definitions
//!
//! Defines the clap commands for the scenario runner CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Execute the scenarios of a YAML test suite
    Test {
        /// Path to the YAML test suite file
        path: PathBuf,

        /// Verbose output (step timings, skipped scenarios)
        #[arg(long, short)]
        verbose: bool,

        /// Number of scenarios to run at once
        #[arg(long, short, default_value_t = 1)]
        jobs: usize,

        /// Only run scenarios whose name contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Also run scenarios tagged `network`
        #[arg(long)]
        network: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one GET request and check the response
    Request {
        /// URL to request
        url: String,

        /// Expected status code (200 when no expectation is given)
        #[arg(long)]
        status: Option<u16>,

        /// Expected status text (e.g., "OK")
        #[arg(long)]
        status_text: Option<String>,

        /// Text the body must contain
        #[arg(long)]
        body_contains: Option<String>,

        /// Output the response summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}
