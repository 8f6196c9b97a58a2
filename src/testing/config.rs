//! Test suite configuration types
//!
//! Defines the data structures for deserializing YAML test suites.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::driver::{AttachMode, OptionChoice};
use crate::http::ResponseExpectation;

/// Locator that addresses the current element inside an `each` step
pub const ITEM: &str = "$item";

/// A suite of scenarios loaded from a YAML file
#[derive(Deserialize, Debug, Clone)]
pub struct TestSuite {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// Steps prepended to every scenario (usually a `visit`)
    #[serde(default)]
    pub before_each: Vec<TestStep>,
    /// Named step sequences callable with `run`
    #[serde(default)]
    pub sequences: BTreeMap<String, Vec<TestStep>>,
    pub scenarios: Vec<TestScenario>,
}

/// One scenario, run on a fresh page
#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: Option<String>,
    /// Free-form tags; `network` scenarios need outbound HTTP
    #[serde(default)]
    pub tags: Vec<String>,
    pub steps: Vec<TestStep>,
}

impl TestScenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A single test step in the execution flow
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Load a page of the site under test
    Visit { url: String },
    /// Check the document title
    Title { equals: String },
    /// Type literal text, one keystroke at a time
    Type {
        locator: String,
        text: String,
        /// Per-keystroke delay; 0 types everything at once
        delay_ms: Option<u64>,
    },
    Clear { locator: String },
    /// Choose an option of a `<select>` by exactly one of text, value or index
    Select {
        locator: String,
        text: Option<String>,
        value: Option<String>,
        index: Option<usize>,
    },
    Check { locator: String },
    Uncheck { locator: String },
    /// Click: flips checkboxes, submits forms, follows links
    Click { locator: String },
    SelectFile {
        locator: String,
        /// Path relative to the suite file, or `@alias`
        file: String,
        #[serde(default)]
        mode: AttachMode,
    },
    /// Register a file from the fixtures directory under an alias
    Fixture { path: String, alias: String },
    /// Manipulate an element directly (`show`, `hide`, `removeAttr`, ...)
    Invoke {
        locator: String,
        method: String,
        #[serde(default)]
        args: Vec<String>,
    },
    InstallClock,
    /// Advance the simulated clock
    Tick { ms: u64 },
    Assert { locator: String, expect: Expectation },
    /// GET a URL outside the page
    Request {
        url: String,
        #[serde(default)]
        expect: ResponseExpectation,
    },
    /// Run a named sequence
    Run { sequence: String },
    /// Run `steps` once per matched element, bound to `$item`
    Each { locator: String, steps: Vec<TestStep> },
}

impl TestStep {
    /// The step's action keyword
    pub fn action(&self) -> &'static str {
        match self {
            TestStep::Visit { .. } => "visit",
            TestStep::Title { .. } => "title",
            TestStep::Type { .. } => "type",
            TestStep::Clear { .. } => "clear",
            TestStep::Select { .. } => "select",
            TestStep::Check { .. } => "check",
            TestStep::Uncheck { .. } => "uncheck",
            TestStep::Click { .. } => "click",
            TestStep::SelectFile { .. } => "select_file",
            TestStep::Fixture { .. } => "fixture",
            TestStep::Invoke { .. } => "invoke",
            TestStep::InstallClock => "install_clock",
            TestStep::Tick { .. } => "tick",
            TestStep::Assert { .. } => "assert",
            TestStep::Request { .. } => "request",
            TestStep::Run { .. } => "run",
            TestStep::Each { .. } => "each",
        }
    }

    /// One-line summary for step logs
    pub fn describe(&self) -> String {
        match self {
            TestStep::Visit { url } => format!("visit {}", url),
            TestStep::Title { equals } => format!("title is '{}'", equals),
            TestStep::Type { locator, text, .. } => {
                format!("type '{}' into {}", shorten(text, 40), locator)
            }
            TestStep::Clear { locator } => format!("clear {}", locator),
            TestStep::Select { locator, .. } => match self.option_choice() {
                Ok(choice) => format!("select {} in {}", choice, locator),
                Err(_) => format!("select in {}", locator),
            },
            TestStep::Check { locator } => format!("check {}", locator),
            TestStep::Uncheck { locator } => format!("uncheck {}", locator),
            TestStep::Click { locator } => format!("click {}", locator),
            TestStep::SelectFile { locator, file, mode } => {
                format!("select file {} on {} ({:?})", file, locator, mode)
            }
            TestStep::Fixture { path, alias } => format!("fixture {} as @{}", path, alias),
            TestStep::Invoke {
                locator,
                method,
                args,
            } => format!("invoke {}({}) on {}", method, args.join(", "), locator),
            TestStep::InstallClock => "install clock".to_string(),
            TestStep::Tick { ms } => format!("tick {}ms", ms),
            TestStep::Assert { locator, expect } => {
                format!("assert {} {}", locator, expect.describe())
            }
            TestStep::Request { url, .. } => format!("request {}", url),
            TestStep::Run { sequence } => format!("run {}", sequence),
            TestStep::Each { locator, steps } => {
                format!("each {} ({} steps)", locator, steps.len())
            }
        }
    }

    /// The option a `select` step asks for
    pub fn option_choice(&self) -> Result<OptionChoice> {
        let TestStep::Select {
            locator,
            text,
            value,
            index,
        } = self
        else {
            return Err(Error::Internal(format!(
                "'{}' step has no option choice",
                self.action()
            )));
        };
        match (text, value, index) {
            (Some(text), None, None) => Ok(OptionChoice::Text(text.clone())),
            (None, Some(value), None) => Ok(OptionChoice::Value(value.clone())),
            (None, None, Some(index)) => Ok(OptionChoice::Index(*index)),
            _ => Err(Error::Config(format!(
                "select on '{}' needs exactly one of 'text', 'value' or 'index'",
                locator
            ))),
        }
    }
}

/// Expectations for the elements matched by an `assert` step
///
/// Every field present must hold for every matched element, except
/// `length` which checks the number of matches.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    pub visible: Option<bool>,
    pub checked: Option<bool>,
    /// Exact `value` property
    pub value: Option<String>,
    /// Exact trimmed text content
    pub text: Option<String>,
    /// Substring of the text content
    pub contains: Option<String>,
    pub attr: Option<AttrExpectation>,
    /// Number of matched elements
    pub length: Option<usize>,
    /// Name of the first attached file
    pub file_name: Option<String>,
}

impl Expectation {
    pub fn is_empty(&self) -> bool {
        *self == Expectation::default()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(visible) = self.visible {
            parts.push(if visible { "visible" } else { "hidden" }.to_string());
        }
        if let Some(checked) = self.checked {
            parts.push(if checked { "checked" } else { "unchecked" }.to_string());
        }
        if let Some(value) = &self.value {
            parts.push(format!("value '{}'", shorten(value, 40)));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text '{}'", text));
        }
        if let Some(contains) = &self.contains {
            parts.push(format!("contains '{}'", contains));
        }
        if let Some(attr) = &self.attr {
            parts.push(attr.describe());
        }
        if let Some(length) = self.length {
            parts.push(format!("length {}", length));
        }
        if let Some(name) = &self.file_name {
            parts.push(format!("file '{}'", name));
        }
        parts.join(", ")
    }
}

/// Attribute expectation; without `value` only presence is checked
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AttrExpectation {
    pub name: String,
    pub value: Option<String>,
    /// Set to false to require the attribute to be absent
    #[serde(default = "default_present")]
    pub present: bool,
}

fn default_present() -> bool {
    true
}

impl AttrExpectation {
    pub fn describe(&self) -> String {
        match (&self.value, self.present) {
            (_, false) => format!("without attr '{}'", self.name),
            (Some(value), true) => format!("attr {}='{}'", self.name, value),
            (None, true) => format!("with attr '{}'", self.name),
        }
    }
}

fn shorten(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Load and parse a suite file
pub fn load_suite(path: &Path) -> Result<TestSuite> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read test suite '{}': {}",
            path.display(),
            e
        ))
    })?;
    parse_suite(&content)
}

pub fn parse_suite(content: &str) -> Result<TestSuite> {
    let suite: TestSuite = serde_yaml::from_str(content)?;

    for scenario in &suite.scenarios {
        if scenario.steps.is_empty() {
            return Err(Error::Config(format!(
                "Scenario '{}' has no steps",
                scenario.name
            )));
        }
    }
    Ok(suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r##"
name: sample
before_each:
  - action: visit
    url: src/index.html
sequences:
  greet:
    - action: type
      locator: "#firstName"
      text: Mike
scenarios:
  - name: selects by index
    tags: [select]
    steps:
      - action: select
        locator: "#product"
        index: 1
      - action: assert
        locator: "#product"
        expect:
          value: blog
  - name: clock
    steps:
      - action: install_clock
      - action: tick
        ms: 3000
      - action: select_file
        locator: "#file-upload"
        file: "@sampleFile"
        mode: drag_drop
      - action: assert
        locator: "#privacy a"
        expect:
          attr:
            name: target
            value: _blank
"##;

    #[test]
    fn test_parse_suite() {
        let suite = parse_suite(SUITE).unwrap();
        assert_eq!(suite.name, "sample");
        assert_eq!(
            suite.before_each,
            vec![TestStep::Visit {
                url: "src/index.html".to_string()
            }]
        );
        assert_eq!(suite.sequences["greet"].len(), 1);
        assert!(suite.scenarios[0].has_tag("select"));

        let select = &suite.scenarios[0].steps[0];
        assert_eq!(select.option_choice().unwrap(), OptionChoice::Index(1));

        let clock = &suite.scenarios[1].steps;
        assert_eq!(clock[0], TestStep::InstallClock);
        assert!(matches!(
            &clock[2],
            TestStep::SelectFile {
                mode: AttachMode::DragDrop,
                ..
            }
        ));
        let TestStep::Assert { expect, .. } = &clock[3] else {
            panic!("expected assert step");
        };
        assert_eq!(expect.describe(), "attr target='_blank'");
    }

    #[test]
    fn test_select_needs_exactly_one_choice() {
        let step = TestStep::Select {
            locator: "#product".to_string(),
            text: Some("Blog".to_string()),
            value: Some("blog".to_string()),
            index: None,
        };
        assert!(matches!(step.option_choice(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_expectation_field_is_rejected() {
        let yaml = r##"
name: bad
scenarios:
  - name: typo
    steps:
      - action: assert
        locator: "#phone"
        expect:
          visable: true
"##;
        assert!(matches!(parse_suite(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_scenario_without_steps_is_rejected() {
        let yaml = "name: empty\nscenarios:\n  - name: nothing\n    steps: []\n";
        let err = parse_suite(yaml).unwrap_err();
        assert!(err.to_string().contains("has no steps"));
    }
}
