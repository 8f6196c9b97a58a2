//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{logging, paths, Error, Result};
use crate::driver::simulated::SimulatedBrowser;
use crate::driver::Driver;
use crate::http::{RequestProbe, ResponseExpectation};
use crate::site::Site;
use crate::testing::{self, DriverFactory, RunContext, SuiteOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config, config_file: Option<PathBuf>) -> Result<()> {
    match command {
        Commands::Test {
            path,
            verbose,
            jobs,
            filter,
            network,
            json,
        } => {
            let suite = testing::load_suite(&path)?;
            let base_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf();

            let base_url = config.site.base_url.clone();
            let factory: DriverFactory = Arc::new(move || {
                Box::new(SimulatedBrowser::new(Site::cac_tat(&base_url))) as Box<dyn Driver>
            });
            let ctx = RunContext::new(config, base_dir);
            let options = SuiteOptions {
                jobs,
                filter,
                include_network: network,
            };

            let report = testing::run_suite(&suite, &ctx, &options, factory).await?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                report.print(verbose);
            }

            if report.all_passed() {
                Ok(())
            } else {
                Err(Error::ScenariosFailed {
                    failed: report.failed(),
                    total: report.results.len(),
                })
            }
        }

        Commands::Request {
            url,
            status,
            status_text,
            body_contains,
            json,
        } => {
            let probe = RequestProbe::new(&config.request)?;
            let response = probe.get(&url).await?;
            let expect = ResponseExpectation {
                status,
                status_text,
                body_contains,
            };
            let outcome = expect.check(&response);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "url": response.url,
                        "status": response.status,
                        "status_text": response.status_text,
                        "body_bytes": response.body.len(),
                        "passed": outcome.is_ok(),
                    }))?
                );
            } else {
                let marker = if outcome.is_ok() {
                    "✓".green()
                } else {
                    "✗".red()
                };
                println!(
                    "{} {} {} {} ({} bytes)",
                    marker,
                    response.url,
                    response.status,
                    response.status_text,
                    response.body.len()
                );
            }
            outcome
        }

        Commands::Config => {
            let source = config_file
                .or_else(|| paths::config_path().filter(|p| p.exists()))
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(defaults)".to_string());
            println!("{} {}", "Config:".bold(), source);
            println!("\n[site]");
            println!("  base_url = {}", config.site.base_url);
            println!("\n[retry]");
            println!("  timeout_ms = {}", config.retry.timeout_ms);
            println!("  poll_interval_ms = {}", config.retry.poll_interval_ms);
            println!("\n[typing]");
            println!("  delay_ms = {}", config.typing.delay_ms);
            println!("\n[fixtures]");
            println!("  dir = {}", config.fixtures.dir.display());
            println!("\n[request]");
            println!("  timeout_secs = {}", config.request.timeout_secs);
            println!("  use_system_proxy = {}", config.request.use_system_proxy);
            if let Some(log) = logging::default_log_path() {
                println!("\n{} {}", "Log file (--log-file):".bold(), log.display());
            }
            Ok(())
        }
    }
}
