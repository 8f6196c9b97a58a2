//! Console and JSON reporting

use colored::Colorize;
use serde::Serialize;

use crate::common::Result;

use super::runner::TestResult;

#[derive(Debug, Clone, Serialize)]
pub struct SkippedScenario {
    pub name: String,
    pub reason: String,
}

/// Results of a suite run, in declaration order
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub results: Vec<TestResult>,
    pub skipped: Vec<SkippedScenario>,
    pub duration_ms: u64,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Print every scenario followed by a summary line
    pub fn print(&self, verbose: bool) {
        println!("\n{} {}", "Suite:".blue().bold(), self.name.white().bold());
        for result in &self.results {
            print_result(result, verbose);
        }
        if verbose {
            for skipped in &self.skipped {
                println!(
                    "  {} {} ({})",
                    "-".yellow(),
                    skipped.name,
                    skipped.reason.dimmed()
                );
            }
        }

        let passed = format!("{} passed", self.passed());
        let failed = format!("{} failed", self.failed());
        let skipped = format!("{} skipped", self.skipped.len());
        println!(
            "\n{} {}, {}, {} ({} ms)",
            "Summary:".bold(),
            passed.green(),
            if self.all_passed() {
                failed.normal()
            } else {
                failed.red().bold()
            },
            skipped.yellow(),
            self.duration_ms
        );
    }
}

/// Print one scenario's step log
pub fn print_result(result: &TestResult, verbose: bool) {
    println!(
        "\n{} {}",
        "Running Test:".blue().bold(),
        result.name.white().bold()
    );

    for step in &result.steps {
        let timing = if verbose {
            format!(" ({} ms)", step.duration_ms)
        } else {
            String::new()
        };
        match &step.error {
            None => println!(
                "  {} Step {}: {}{}",
                "✓".green(),
                step.index,
                step.description.dimmed(),
                timing.dimmed()
            ),
            Some(error) => {
                println!(
                    "  {} Step {}: {}{}",
                    "✗".red(),
                    step.index,
                    step.description,
                    timing.dimmed()
                );
                println!("      {}", error.red());
            }
        }
    }

    if result.passed {
        println!("{} {}", "✓".green().bold(), "Test Passed".green().bold());
    } else {
        let skipped = result.steps_total - result.steps_run;
        println!(
            "{} {} ({} of {} steps run, {} not run)",
            "✗".red().bold(),
            "Test Failed".red().bold(),
            result.steps_run,
            result.steps_total,
            skipped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::runner::{ScenarioState, StepRecord};

    fn result(name: &str, passed: bool) -> TestResult {
        TestResult {
            name: name.to_string(),
            passed,
            state: if passed {
                ScenarioState::Passed
            } else {
                ScenarioState::Failed
            },
            steps_run: 1,
            steps_total: 2,
            error: (!passed).then(|| "boom".to_string()),
            steps: vec![StepRecord {
                index: 1,
                description: "visit src/index.html".to_string(),
                passed,
                error: (!passed).then(|| "boom".to_string()),
                duration_ms: 3,
            }],
            duration_ms: 3,
        }
    }

    #[test]
    fn test_counts_and_json() {
        let report = SuiteReport {
            name: "cac".to_string(),
            results: vec![result("a", true), result("b", false)],
            skipped: vec![SkippedScenario {
                name: "c".to_string(),
                reason: "needs network access".to_string(),
            }],
            duration_ms: 10,
        };
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_passed());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["results"][1]["state"], "failed");
        assert_eq!(json["results"][1]["error"], "boom");
        assert_eq!(json["skipped"][0]["name"], "c");
    }
}
