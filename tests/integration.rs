//! End-to-end integration tests for the scenario runner
//!
//! These tests run the bundled suite against the simulated browser, both
//! through the library and through the `cactat` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use cactat::common::config::Config;
use cactat::testing::{self, DriverFactory, RunContext, ScenarioState, SuiteOptions};
use cactat::{Driver, SimulatedBrowser, Site};

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn suite_path() -> PathBuf {
    manifest_dir().join("scenarios").join("cac_tat.yaml")
}

/// Fast settings: no typing delay, short retry window
fn fast_config() -> Config {
    let mut config = Config::default();
    config.retry.timeout_ms = 300;
    config.retry.poll_interval_ms = 10;
    config.typing.delay_ms = 0;
    config
}

fn factory() -> DriverFactory {
    Arc::new(|| Box::new(SimulatedBrowser::new(Site::cac_tat("http://localhost/"))) as Box<dyn Driver>)
}

fn context(base_dir: &Path) -> RunContext {
    RunContext::new(fast_config(), base_dir)
}

/// Output from a cactat invocation
#[derive(Debug)]
struct CliOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

/// Run the binary with an isolated config and data directory
fn run_cli(home: &Path, args: &[&str]) -> CliOutput {
    let output = Command::new(env!("CARGO_BIN_EXE_cactat"))
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run cactat");

    CliOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
    }
}

// ============== Tests ==============

#[tokio::test]
async fn test_bundled_suite_passes() {
    let path = suite_path();
    let suite = testing::load_suite(&path).unwrap();
    let ctx = context(path.parent().unwrap());
    let options = SuiteOptions {
        jobs: 4,
        ..Default::default()
    };

    let report = testing::run_suite(&suite, &ctx, &options, factory()).await.unwrap();

    for result in &report.results {
        assert!(
            result.passed,
            "scenario '{}' failed: {:?}",
            result.name, result.error
        );
        assert_eq!(result.state, ScenarioState::Passed);
        assert_eq!(result.steps_run, result.steps_total);
    }
    assert_eq!(report.results.len() + report.skipped.len(), suite.scenarios.len());
    assert!(report
        .skipped
        .iter()
        .any(|s| s.name == "faz uma requisição HTTP"));
}

#[tokio::test]
async fn test_failing_step_halts_only_its_scenario() {
    let yaml = r##"
name: failures
before_each:
  - action: visit
    url: src/index.html
scenarios:
  - name: missing option
    steps:
      - action: select
        locator: "#product"
        text: Podcast
      - action: assert
        locator: "#product"
        expect:
          value: blog
  - name: still runs
    steps:
      - action: title
        equals: Central de Atendimento ao Cliente TAT
  - name: banner hidden without the clock
    steps:
      - action: click
        locator: "button[type=submit]"
      - action: tick
        ms: 3000
"##;
    let suite = testing::parse_suite(yaml).unwrap();
    let ctx = context(Path::new("."));
    let report = testing::run_suite(&suite, &ctx, &SuiteOptions::default(), factory())
        .await
        .unwrap();

    let missing = &report.results[0];
    assert!(!missing.passed);
    assert_eq!(missing.steps_run, 2);
    assert_eq!(missing.steps_total, 3);
    assert!(missing
        .error
        .as_deref()
        .unwrap()
        .contains("No option matching text 'Podcast'"));

    assert!(report.results[1].passed);

    let clockless = &report.results[2];
    assert!(!clockless.passed);
    assert!(clockless
        .error
        .as_deref()
        .unwrap()
        .contains("Simulated clock is not installed"));
}

#[tokio::test]
async fn test_scenarios_start_from_a_fresh_page() {
    let yaml = r##"
name: isolation
before_each:
  - action: visit
    url: src/index.html
scenarios:
  - name: types a name
    steps:
      - action: type
        locator: "#firstName"
        text: Mike
      - action: install_clock
  - name: sees an empty form and no clock
    steps:
      - action: assert
        locator: "#firstName"
        expect:
          value: ""
      - action: click
        locator: "button[type=submit]"
      - action: tick
        ms: 3000
"##;
    let suite = testing::parse_suite(yaml).unwrap();
    let ctx = context(Path::new("."));
    let report = testing::run_suite(&suite, &ctx, &SuiteOptions::default(), factory())
        .await
        .unwrap();

    assert!(report.results[0].passed);
    let second = &report.results[1];
    assert_eq!(second.steps_run, 4);
    assert!(!second.passed);
}

#[test]
fn test_cli_runs_bundled_suite() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("fast.toml");
    fs::write(
        &config,
        "[retry]\ntimeout_ms = 300\npoll_interval_ms = 10\n\n[typing]\ndelay_ms = 0\n",
    )
    .unwrap();

    let suite = suite_path();
    let output = run_cli(
        home.path(),
        &[
            "test",
            suite.to_str().unwrap(),
            "--json",
            "--jobs",
            "4",
            "--config",
            config.to_str().unwrap(),
        ],
    );
    assert!(output.success, "stdout: {}\nstderr: {}", output.stdout, output.stderr);

    let report: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert!(report["results"].as_array().unwrap().len() > 20);
    assert_eq!(report["skipped"][0]["name"], "faz uma requisição HTTP");
}

#[test]
fn test_cli_reports_failed_scenarios() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("fast.toml");
    fs::write(&config, "[retry]\ntimeout_ms = 100\npoll_interval_ms = 10\n").unwrap();
    let suite = home.path().join("failing.yaml");
    fs::write(
        &suite,
        r##"
name: failing
scenarios:
  - name: wrong title
    steps:
      - action: visit
        url: src/index.html
      - action: title
        equals: Outra página
"##,
    )
    .unwrap();

    let output = run_cli(
        home.path(),
        &[
            "test",
            suite.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ],
    );
    assert!(!output.success);
    assert!(output.stdout.contains("Test Failed"), "{}", output.stdout);
    assert!(output.stderr.contains("1 of 1 scenarios failed"), "{}", output.stderr);
}

#[test]
fn test_cli_config_shows_overrides() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("custom.toml");
    fs::write(&config, "[retry]\ntimeout_ms = 1234\n").unwrap();

    let output = run_cli(home.path(), &["config", "--config", config.to_str().unwrap()]);
    assert!(output.success, "{}", output.stderr);
    assert!(output.stdout.contains("timeout_ms = 1234"));
    assert!(output.stdout.contains("poll_interval_ms = 50"));
}

#[test]
fn test_cli_rejects_invalid_config() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("bad.toml");
    fs::write(&config, "[retry]\npoll_interval_ms = 0\n").unwrap();

    let output = run_cli(home.path(), &["config", "--config", config.to_str().unwrap()]);
    assert!(!output.success);
    assert!(output.stderr.contains("poll_interval_ms"), "{}", output.stderr);
}
