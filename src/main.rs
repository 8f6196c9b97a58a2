//! CAC TAT scenario runner
//!
//! Runs YAML scenarios against the "Central de Atendimento ao Cliente TAT"
//! contact form and probes its published endpoint.

use std::path::PathBuf;

use cactat::common::config::Config;
use cactat::common::logging;
use cactat::{cli, commands};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "cactat", about = "Scenario runner for the CAC TAT contact form")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: config.toml in the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to a file (`--log-file=PATH`); without a value the platform data dir is used
    #[arg(long, global = true, num_args = 0..=1, require_equals = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_path = match &cli.log_file {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => logging::default_log_path(),
        None => None,
    };
    let guard = match log_path {
        Some(path) => match logging::init_with_file(&path) {
            Ok(guard) => Some(guard),
            Err(e) => {
                logging::init_cli();
                tracing::warn!(path = %path.display(), error = %e, "log file unavailable");
                None
            }
        },
        None => {
            logging::init_cli();
            None
        }
    };

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let result = match config {
        Ok(config) => cli::dispatch(cli.command, config, cli.config).await,
        Err(e) => Err(e),
    };

    // Flush the file writer before exiting
    drop(guard);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
