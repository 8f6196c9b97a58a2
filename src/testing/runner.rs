//! Test runner implementation
//!
//! Executes the steps of one scenario against a [`Driver`] in strict order
//! and stops at the first failure. Locator resolution and assertions poll
//! the live page until they hold or the retry window closes; actions are
//! performed exactly once.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::common::config::{Config, RequestConfig, RetryConfig};
use crate::common::{Error, Result};
use crate::dom::Locator;
use crate::driver::{AttachMode, Driver, ElementId, Invocation, OptionChoice};
use crate::fixtures::FixtureStore;
use crate::http::{RequestProbe, ResponseExpectation, ResponseSummary};

use super::assertions::Predicate;
use super::config::{Expectation, TestStep, ITEM};
use super::sequences::SequenceRegistry;
use super::wait::Wait;

/// Settings shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    /// Directory of the suite file; fixture paths resolve against it
    pub base_dir: PathBuf,
}

impl RunContext {
    pub fn new(config: Config, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base_dir: base_dir.into(),
        }
    }

    pub fn fixtures_dir(&self) -> PathBuf {
        if self.config.fixtures.dir.is_absolute() {
            self.config.fixtures.dir.clone()
        } else {
            self.base_dir.join(&self.config.fixtures.dir)
        }
    }
}

/// Lifecycle of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    NotStarted,
    Loaded,
    Running,
    Passed,
    Failed,
}

impl ScenarioState {
    pub fn is_finished(self) -> bool {
        matches!(self, ScenarioState::Passed | ScenarioState::Failed)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioState::NotStarted => "not started (no page loaded)",
            ScenarioState::Loaded => "loaded",
            ScenarioState::Running => "running",
            ScenarioState::Passed => "passed",
            ScenarioState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a checkbox or radio is toggled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Ensure checked
    Check,
    /// Ensure unchecked
    Uncheck,
    /// Click once
    ClickToggle,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeOptions {
    /// Per-keystroke delay; falls back to the configured default
    pub delay_ms: Option<u64>,
}

/// How many matches an action needs
#[derive(Debug, Clone, Copy)]
enum Cardinality {
    One,
    AtLeastOne,
}

impl Cardinality {
    fn accepts(self, count: usize) -> bool {
        match self {
            Cardinality::One => count == 1,
            Cardinality::AtLeastOne => count >= 1,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Cardinality::One => "exactly 1",
            Cardinality::AtLeastOne => "at least 1",
        }
    }
}

/// Drives one scenario
pub struct ScenarioRunner {
    driver: Box<dyn Driver>,
    state: ScenarioState,
    fixtures: FixtureStore,
    retry: RetryConfig,
    typing_delay_ms: u64,
    request: RequestConfig,
    probe: Option<RequestProbe>,
    /// Element bound to `$item` inside an `each` step
    item: Option<ElementId>,
}

impl ScenarioRunner {
    pub fn new(driver: Box<dyn Driver>, ctx: &RunContext) -> Self {
        Self {
            driver,
            state: ScenarioState::NotStarted,
            fixtures: FixtureStore::new(&ctx.base_dir, ctx.fixtures_dir()),
            retry: ctx.config.retry.clone(),
            typing_delay_ms: ctx.config.typing.delay_ms,
            request: ctx.config.request.clone(),
            probe: None,
            item: None,
        }
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Gate every operation on the scenario state
    fn enter(&mut self, action: &str, needs_page: bool) -> Result<()> {
        match self.state {
            ScenarioState::Passed | ScenarioState::Failed => {
                return Err(Error::invalid_state(action, self.state.to_string()));
            }
            ScenarioState::NotStarted if needs_page => {
                return Err(Error::invalid_state(action, self.state.to_string()));
            }
            ScenarioState::Loaded => self.state = ScenarioState::Running,
            _ => {}
        }
        Ok(())
    }

    fn item(&self) -> Result<ElementId> {
        self.item
            .ok_or_else(|| Error::invalid_locator(ITEM, "only valid inside an 'each' step"))
    }

    /// Resolve `locator`, polling until it matches the needed number of elements
    async fn resolve(&mut self, locator: &str, cardinality: Cardinality) -> Result<Vec<ElementId>> {
        if locator == ITEM {
            return Ok(vec![self.item()?]);
        }
        let parsed = Locator::parse(locator)?;
        let wait = Wait::from_config(&self.retry);
        loop {
            let found = self.driver.find(&parsed).await?;
            if cardinality.accepts(found.len()) {
                return Ok(found);
            }
            if wait.expired() {
                return Err(Error::element_not_found(locator, cardinality.expected(), found.len()));
            }
            wait.pause().await;
        }
    }

    async fn resolve_one(&mut self, locator: &str) -> Result<ElementId> {
        self.resolve(locator, Cardinality::One)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator, Cardinality::One.expected(), 0))
    }

    /// Navigate to `url`; the page is ready when this returns
    pub async fn load_page(&mut self, url: &str) -> Result<()> {
        if self.state.is_finished() {
            return Err(Error::invalid_state("load a page", self.state.to_string()));
        }
        self.driver.navigate(url).await?;
        self.state = match self.state {
            ScenarioState::NotStarted => ScenarioState::Loaded,
            _ => ScenarioState::Running,
        };
        info!(url, "page loaded");
        Ok(())
    }

    pub async fn assert_title(&mut self, expected: &str) -> Result<()> {
        self.enter("check the title", true)?;
        let wait = Wait::from_config(&self.retry);
        loop {
            let actual = self.driver.title().await?;
            if actual == expected {
                return Ok(());
            }
            if wait.expired() {
                return Err(Error::assertion(
                    "title",
                    format!("'{}'", expected),
                    format!("'{}'", actual),
                ));
            }
            wait.pause().await;
        }
    }

    /// Type `text` literally, one keystroke at a time
    pub async fn enter_text(&mut self, locator: &str, text: &str, options: TypeOptions) -> Result<()> {
        self.enter("type", true)?;
        let element = self.resolve_one(locator).await?;
        let delay_ms = options.delay_ms.unwrap_or(self.typing_delay_ms);
        for ch in text.chars() {
            self.driver.type_char(element, ch).await?;
            if delay_ms > 0 {
                sleep(Duration::from_millis(delay_ms)).await;
            }
        }
        debug!(locator, chars = text.chars().count(), delay_ms, "typed");
        Ok(())
    }

    pub async fn clear(&mut self, locator: &str) -> Result<()> {
        self.enter("clear", true)?;
        let element = self.resolve_one(locator).await?;
        self.driver.clear(element).await
    }

    /// Choose an option; returns the select's new value
    pub async fn select_option(&mut self, locator: &str, choice: &OptionChoice) -> Result<String> {
        self.enter("select", true)?;
        let element = self.resolve_one(locator).await?;
        self.driver.select_option(element, choice).await
    }

    /// `Check` and `Uncheck` apply to every match; `ClickToggle` needs one
    pub async fn toggle_control(&mut self, locator: &str, toggle: Toggle) -> Result<()> {
        self.enter("toggle", true)?;
        match toggle {
            Toggle::ClickToggle => {
                let element = self.resolve_one(locator).await?;
                self.driver.click(element).await
            }
            Toggle::Check | Toggle::Uncheck => {
                let checked = toggle == Toggle::Check;
                for element in self.resolve(locator, Cardinality::AtLeastOne).await? {
                    self.driver.set_checked(element, checked).await?;
                }
                Ok(())
            }
        }
    }

    pub async fn click(&mut self, locator: &str) -> Result<()> {
        self.enter("click", true)?;
        let element = self.resolve_one(locator).await?;
        self.driver.click(element).await
    }

    /// Attach a fixture given by path or `@alias`
    pub async fn select_file(&mut self, locator: &str, file: &str, mode: AttachMode) -> Result<()> {
        self.enter("select a file", true)?;
        let fixture = self.fixtures.resolve(file)?;
        let element = self.resolve_one(locator).await?;
        self.driver.attach_file(element, &fixture, mode).await
    }

    pub fn register_fixture(&mut self, path: &str, alias: &str) -> Result<()> {
        self.enter("register a fixture", false)?;
        self.fixtures.register(path, alias)?;
        Ok(())
    }

    pub async fn invoke(&mut self, locator: &str, method: &str, args: &[String]) -> Result<()> {
        self.enter("invoke", true)?;
        let invocation = Invocation::parse(method, args)?;
        for element in self.resolve(locator, Cardinality::AtLeastOne).await? {
            self.driver.invoke(element, &invocation).await?;
        }
        Ok(())
    }

    pub async fn install_clock(&mut self) -> Result<()> {
        self.enter("install the clock", false)?;
        self.driver.install_clock().await
    }

    /// Advance the simulated clock by exactly `ms`; returns callbacks run
    pub async fn advance_clock(&mut self, ms: u64) -> Result<usize> {
        self.enter("advance the clock", false)?;
        self.driver.tick(ms).await
    }

    /// Poll until every expectation holds for the matched elements
    pub async fn assert(&mut self, locator: &str, expect: &Expectation) -> Result<()> {
        self.enter("assert", true)?;
        if expect.is_empty() {
            return Err(Error::Config(format!(
                "assert on '{}' has no expectations",
                locator
            )));
        }
        let predicates = Predicate::from_expectation(expect);
        let parsed = if locator == ITEM {
            None
        } else {
            Some(Locator::parse(locator)?)
        };
        let wait = Wait::from_config(&self.retry);
        loop {
            match self.check_once(locator, parsed.as_ref(), &predicates).await {
                Err(e) if e.is_retryable() && !wait.expired() => wait.pause().await,
                other => return other,
            }
        }
    }

    async fn check_once(&mut self, locator: &str, parsed: Option<&Locator>, predicates: &[Predicate]) -> Result<()> {
        let elements = match parsed {
            Some(parsed) => self.driver.find(parsed).await?,
            None => vec![self.item()?],
        };
        let mut states = Vec::with_capacity(elements.len());
        for element in elements {
            states.push(self.driver.inspect(element).await?);
        }
        for predicate in predicates {
            predicate.check(locator, &states)?;
        }
        Ok(())
    }

    /// One GET outside the page, checked against `expect`
    pub async fn perform_request(&mut self, url: &str, expect: &ResponseExpectation) -> Result<ResponseSummary> {
        self.enter("send a request", false)?;
        let probe = match &self.probe {
            Some(probe) => probe.clone(),
            None => {
                let probe = RequestProbe::new(&self.request)?;
                self.probe = Some(probe.clone());
                probe
            }
        };
        let response = probe.get(url).await?;
        expect.check(&response)?;
        Ok(response)
    }

    /// Execute one step
    pub async fn execute(&mut self, step: &TestStep) -> Result<()> {
        match step {
            TestStep::Each { locator, steps } => self.each(locator, steps).await,
            other => self.execute_leaf(other).await,
        }
    }

    async fn each(&mut self, locator: &str, steps: &[TestStep]) -> Result<()> {
        self.enter("each", true)?;
        let elements = self.resolve(locator, Cardinality::AtLeastOne).await?;
        debug!(locator, count = elements.len(), "each");

        let mut result = Ok(());
        'elements: for element in elements {
            self.item = Some(element);
            for step in steps {
                if let Err(e) = self.execute_leaf(step).await {
                    result = Err(e);
                    break 'elements;
                }
            }
        }
        self.item = None;
        result
    }

    async fn execute_leaf(&mut self, step: &TestStep) -> Result<()> {
        match step {
            TestStep::Visit { url } => self.load_page(url).await,
            TestStep::Title { equals } => self.assert_title(equals).await,
            TestStep::Type {
                locator,
                text,
                delay_ms,
            } => {
                let options = TypeOptions {
                    delay_ms: *delay_ms,
                };
                self.enter_text(locator, text, options).await
            }
            TestStep::Clear { locator } => self.clear(locator).await,
            TestStep::Select { locator, .. } => {
                let choice = step.option_choice()?;
                let value = self.select_option(locator, &choice).await?;
                debug!(locator, value = %value, "selected");
                Ok(())
            }
            TestStep::Check { locator } => self.toggle_control(locator, Toggle::Check).await,
            TestStep::Uncheck { locator } => self.toggle_control(locator, Toggle::Uncheck).await,
            TestStep::Click { locator } => self.click(locator).await,
            TestStep::SelectFile {
                locator,
                file,
                mode,
            } => self.select_file(locator, file, *mode).await,
            TestStep::Fixture { path, alias } => self.register_fixture(path, alias),
            TestStep::Invoke {
                locator,
                method,
                args,
            } => self.invoke(locator, method, args).await,
            TestStep::InstallClock => self.install_clock().await,
            TestStep::Tick { ms } => {
                let ran = self.advance_clock(*ms).await?;
                debug!(ms, ran, "clock advanced");
                Ok(())
            }
            TestStep::Assert { locator, expect } => self.assert(locator, expect).await,
            TestStep::Request { url, expect } => {
                let response = self.perform_request(url, expect).await?;
                debug!(url, status = response.status, "request passed");
                Ok(())
            }
            TestStep::Run { sequence } => Err(Error::Config(format!(
                "sequence '{}' must be expanded before it runs",
                sequence
            ))),
            TestStep::Each { .. } => Err(Error::Config(
                "'each' steps cannot be nested".to_string(),
            )),
        }
    }

    /// Mark the scenario failed; later operations are rejected
    pub fn fail(&mut self) {
        self.state = ScenarioState::Failed;
    }

    /// Conclude the scenario; passes unless a step failed
    pub fn finish(&mut self) -> ScenarioState {
        if self.state != ScenarioState::Failed {
            self.state = ScenarioState::Passed;
        }
        self.state
    }

    /// Release the page and its simulated clock
    pub async fn close(&mut self) -> Result<()> {
        self.item = None;
        self.driver.close().await
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based position in the expanded step list
    pub index: usize,
    pub description: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Result of a test run
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub state: ScenarioState,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
    pub duration_ms: u64,
}

/// Run one scenario on a fresh driver
///
/// A failing step ends the scenario with `passed: false`; only problems
/// with the scenario definition itself are returned as errors.
pub async fn run_scenario(
    name: &str,
    steps: &[TestStep],
    sequences: &SequenceRegistry,
    driver: Box<dyn Driver>,
    ctx: &RunContext,
) -> Result<TestResult> {
    let steps = sequences.expand(steps)?;
    let steps_total = steps.len();
    let started = Instant::now();
    info!(scenario = name, steps = steps_total, "scenario started");

    let mut runner = ScenarioRunner::new(driver, ctx);
    let mut records = Vec::with_capacity(steps_total);
    let mut error = None;

    for (i, step) in steps.iter().enumerate() {
        let step_num = i + 1;
        let step_started = Instant::now();
        debug!(scenario = name, step = step_num, "{}", step.describe());

        let outcome = runner.execute(step).await;
        let duration_ms = step_started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => records.push(StepRecord {
                index: step_num,
                description: step.describe(),
                passed: true,
                error: None,
                duration_ms,
            }),
            Err(e) => {
                warn!(scenario = name, step = step_num, error = %e, "step failed");
                runner.fail();
                records.push(StepRecord {
                    index: step_num,
                    description: step.describe(),
                    passed: false,
                    error: Some(e.to_string()),
                    duration_ms,
                });
                error = Some(e.to_string());
                break;
            }
        }
    }

    let state = runner.finish();
    // Cleanup: drop the page and its clock
    if let Err(e) = runner.close().await {
        debug!(scenario = name, error = %e, "close failed");
    }

    let passed = state == ScenarioState::Passed;
    info!(scenario = name, passed, "scenario finished");
    Ok(TestResult {
        name: name.to_string(),
        passed,
        state,
        steps_run: records.len(),
        steps_total,
        error,
        steps: records,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
