//! Browser driver seam
//!
//! The scenario runner only talks to a page through [`Driver`]. A driver
//! resolves locators to element handles, performs user-level interactions
//! and reports element state snapshots. [`simulated::SimulatedBrowser`] is
//! the in-process implementation used by the CLI and the test suite.

pub mod simulated;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{Error, Result};
use crate::dom::Locator;
use crate::fixtures::FixtureFile;

/// Handle to an element of the currently loaded page
///
/// Handles carry the page generation they were resolved on; a navigation
/// invalidates every outstanding handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId {
    page: u64,
    node: usize,
}

impl ElementId {
    pub fn new(page: u64, node: usize) -> Self {
        Self { page, node }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn node(&self) -> usize {
        self.node
    }
}

/// Snapshot of an element's observable state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementState {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// `value` property for form controls
    pub value: Option<String>,
    /// Checked state for checkboxes and radios
    pub checked: Option<bool>,
    pub visible: bool,
    pub text: String,
    /// Names of files attached to a file input
    pub files: Vec<String>,
}

/// How an option of a `<select>` is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionChoice {
    /// Visible option text
    Text(String),
    /// `value` attribute
    Value(String),
    /// Zero-based position in document order
    Index(usize),
}

impl fmt::Display for OptionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionChoice::Text(text) => write!(f, "text '{}'", text),
            OptionChoice::Value(value) => write!(f, "value '{}'", value),
            OptionChoice::Index(index) => write!(f, "index {}", index),
        }
    }
}

/// How a file reaches a file input
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachMode {
    /// Set through the input like a file picker would
    #[default]
    Input,
    /// Dropped onto the element
    DragDrop,
}

/// Direct element manipulation, bypassing user interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Show,
    Hide,
    RemoveAttr(String),
    Attr { name: String, value: String },
    Val(String),
    Text(String),
}

impl Invocation {
    /// Parse a jQuery-style method name and its arguments
    pub fn parse(method: &str, args: &[String]) -> Result<Self> {
        let arg = |i: usize| -> Result<String> {
            args.get(i).cloned().ok_or_else(|| {
                Error::Config(format!(
                    "invoke '{}' requires {} argument(s), got {}",
                    method,
                    i + 1,
                    args.len()
                ))
            })
        };

        match method {
            "show" => Ok(Invocation::Show),
            "hide" => Ok(Invocation::Hide),
            "removeAttr" | "remove_attr" => Ok(Invocation::RemoveAttr(arg(0)?)),
            "attr" => Ok(Invocation::Attr {
                name: arg(0)?,
                value: arg(1)?,
            }),
            "val" => Ok(Invocation::Val(arg(0)?)),
            "text" => Ok(Invocation::Text(arg(0)?)),
            _ => Err(Error::Config(format!("Unknown invoke method: {}", method))),
        }
    }
}

/// Browser automation contract
#[async_trait]
pub trait Driver: Send {
    /// Load `url`; returns once the DOM is ready
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// URL of the current page, if any
    fn current_url(&self) -> Option<String>;

    async fn title(&mut self) -> Result<String>;

    /// Elements matching `locator` in document order
    async fn find(&mut self, locator: &Locator) -> Result<Vec<ElementId>>;

    async fn inspect(&mut self, element: ElementId) -> Result<ElementState>;

    /// Press one key while `element` has focus
    async fn type_char(&mut self, element: ElementId, ch: char) -> Result<()>;

    async fn clear(&mut self, element: ElementId) -> Result<()>;

    /// Select an option; returns the select's resulting value
    async fn select_option(&mut self, element: ElementId, choice: &OptionChoice) -> Result<String>;

    /// Set checked state; no-op when already in that state
    async fn set_checked(&mut self, element: ElementId, checked: bool) -> Result<()>;

    async fn click(&mut self, element: ElementId) -> Result<()>;

    async fn attach_file(&mut self, element: ElementId, file: &FixtureFile, mode: AttachMode) -> Result<()>;

    async fn invoke(&mut self, element: ElementId, invocation: &Invocation) -> Result<()>;

    /// Install the simulated clock for this and later page loads
    async fn install_clock(&mut self) -> Result<()>;

    /// Advance the simulated clock; returns the number of callbacks run
    async fn tick(&mut self, ms: u64) -> Result<usize>;

    /// Drop the page and any simulated clock
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_invocations() {
        assert_eq!(Invocation::parse("show", &[]).unwrap(), Invocation::Show);
        assert_eq!(
            Invocation::parse("removeAttr", &args(&["target"])).unwrap(),
            Invocation::RemoveAttr("target".to_string())
        );
        assert_eq!(
            Invocation::parse("attr", &args(&["target", "_self"])).unwrap(),
            Invocation::Attr {
                name: "target".to_string(),
                value: "_self".to_string()
            }
        );
    }

    #[test]
    fn test_parse_invocation_errors() {
        assert!(Invocation::parse("attr", &args(&["target"])).is_err());
        assert!(Invocation::parse("val", &[]).is_err());
        let err = Invocation::parse("focus", &[]).unwrap_err();
        assert!(err.to_string().contains("Unknown invoke method"));
    }

    #[test]
    fn test_option_choice_display() {
        assert_eq!(OptionChoice::Index(1).to_string(), "index 1");
        assert_eq!(OptionChoice::Text("YouTube".into()).to_string(), "text 'YouTube'");
    }
}
