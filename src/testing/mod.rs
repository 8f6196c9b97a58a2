//! E2E Test Runner
//!
//! Reads YAML suites of scenarios and executes them step by step through a
//! [`Driver`](crate::driver::Driver). Assertions are made against element
//! state snapshots rather than rendered text.

pub mod assertions;
mod config;
pub mod report;
mod runner;
pub mod sequences;
mod suite;
pub mod wait;

pub use config::*;
pub use report::{print_result, SkippedScenario, SuiteReport};
pub use runner::{
    run_scenario, RunContext, ScenarioRunner, ScenarioState, StepRecord, TestResult, Toggle,
    TypeOptions,
};
pub use sequences::{SequenceRegistry, FILL_MANDATORY_FIELDS_AND_SUBMIT};
pub use suite::{run_suite, sequences_for, DriverFactory, SuiteOptions, NETWORK_TAG};
