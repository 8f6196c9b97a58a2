//! Suite execution
//!
//! Every selected scenario runs on its own driver in its own task. A
//! semaphore bounds how many run at once; results come back in declaration
//! order regardless of completion order.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::common::{Error, Result};
use crate::driver::Driver;

use super::config::{TestScenario, TestStep, TestSuite};
use super::report::{SkippedScenario, SuiteReport};
use super::runner::{run_scenario, RunContext, TestResult};
use super::sequences::SequenceRegistry;

/// Tag of scenarios that reach outside the machine
pub const NETWORK_TAG: &str = "network";

/// Builds a fresh driver for each scenario
pub type DriverFactory = Arc<dyn Fn() -> Box<dyn Driver> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Scenarios allowed to run at once
    pub jobs: usize,
    /// Case-insensitive substring a scenario name must contain
    pub filter: Option<String>,
    /// Run scenarios tagged `network`
    pub include_network: bool,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            filter: None,
            include_network: false,
        }
    }
}

impl SuiteOptions {
    fn skip_reason(&self, scenario: &TestScenario) -> Option<String> {
        if let Some(filter) = &self.filter {
            if !scenario.name.to_lowercase().contains(&filter.to_lowercase()) {
                return Some(format!("does not match filter '{}'", filter));
            }
        }
        if scenario.has_tag(NETWORK_TAG) && !self.include_network {
            return Some("needs network access (use --network)".to_string());
        }
        None
    }
}

/// Sequences of the suite layered over the built-in ones
pub fn sequences_for(suite: &TestSuite) -> SequenceRegistry {
    let mut registry = SequenceRegistry::builtin();
    for (name, steps) in &suite.sequences {
        registry.define(name, steps.clone());
    }
    registry
}

/// Run the suite and collect every result
///
/// Definition problems (unknown sequences, cycles) are reported before any
/// scenario starts.
pub async fn run_suite(
    suite: &TestSuite,
    ctx: &RunContext,
    options: &SuiteOptions,
    factory: DriverFactory,
) -> Result<SuiteReport> {
    let started = Instant::now();
    let sequences = Arc::new(sequences_for(suite));

    let mut selected: Vec<(String, Vec<TestStep>)> = Vec::new();
    let mut skipped = Vec::new();
    for scenario in &suite.scenarios {
        if let Some(reason) = options.skip_reason(scenario) {
            debug!(scenario = %scenario.name, reason = %reason, "skipped");
            skipped.push(SkippedScenario {
                name: scenario.name.clone(),
                reason,
            });
            continue;
        }
        let steps: Vec<TestStep> = suite
            .before_each
            .iter()
            .chain(scenario.steps.iter())
            .cloned()
            .collect();
        sequences.expand(&steps).map_err(|e| {
            Error::Config(format!("Scenario '{}': {}", scenario.name, e))
        })?;
        selected.push((scenario.name.clone(), steps));
    }

    let jobs = options.jobs.max(1);
    info!(
        suite = %suite.name,
        scenarios = selected.len(),
        skipped = skipped.len(),
        jobs,
        "running suite"
    );

    let semaphore = Arc::new(Semaphore::new(jobs));
    let ctx = Arc::new(ctx.clone());
    let mut tasks = JoinSet::new();
    for (index, (name, steps)) in selected.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let sequences = Arc::clone(&sequences);
        let ctx = Arc::clone(&ctx);
        let factory = Arc::clone(&factory);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::Internal(format!("scenario semaphore closed: {}", e)))?;
            let driver = factory();
            let result = run_scenario(&name, &steps, &sequences, driver, &ctx).await?;
            Ok::<_, Error>((index, result))
        });
    }

    let mut results: Vec<Option<TestResult>> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) =
            joined.map_err(|e| Error::Internal(format!("scenario task failed: {}", e)))??;
        if results.len() <= index {
            results.resize_with(index + 1, || None);
        }
        results[index] = Some(result);
    }

    Ok(SuiteReport {
        name: suite.name.clone(),
        results: results.into_iter().flatten().collect(),
        skipped,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
