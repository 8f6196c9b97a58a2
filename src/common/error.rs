//! Error types for the scenario runner
//!
//! Every failure names the locator or URL involved together with the
//! concrete expected and actual values, so a failed step can be diagnosed
//! from the report alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario runner
#[derive(Error, Debug)]
pub enum Error {
    // === Page Errors ===
    #[error("Failed to load page '{url}': {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element '{locator}' not found: expected {expected}, found {actual}")]
    ElementNotFound {
        locator: String,
        expected: String,
        actual: usize,
    },

    #[error("Element handle is stale (page was reloaded). Query '{0}' again")]
    StaleElement(String),

    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("No option matching {option} in '{locator}'")]
    OptionNotFound { locator: String, option: String },

    // === Assertion Errors ===
    #[error("Assertion failed on '{locator}': expected {expected}, got {actual}")]
    Assertion {
        locator: String,
        expected: String,
        actual: String,
    },

    // === Request Errors ===
    #[error("Request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },

    // === Runner Errors ===
    #[error("Cannot {action} while scenario is {state}")]
    InvalidState { action: String, state: String },

    #[error("Simulated clock is not installed. Add an 'install_clock' step before the page starts its timers")]
    ClockNotInstalled,

    #[error("Unknown fixture alias '@{0}'. Register it with a 'fixture' step first")]
    UnknownAlias(String),

    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a navigation error
    pub fn navigation(url: &str, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an element not found error for a cardinality mismatch
    pub fn element_not_found(locator: &str, expected: impl Into<String>, actual: usize) -> Self {
        Self::ElementNotFound {
            locator: locator.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    /// Create an option not found error
    pub fn option_not_found(locator: &str, option: impl Into<String>) -> Self {
        Self::OptionNotFound {
            locator: locator.to_string(),
            option: option.into(),
        }
    }

    /// Create an assertion error carrying expected and actual values
    pub fn assertion(
        locator: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            locator: locator.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a request error
    pub fn request(url: &str, reason: impl Into<String>) -> Self {
        Self::Request {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(action: &str, state: impl Into<String>) -> Self {
        Self::InvalidState {
            action: action.to_string(),
            state: state.into(),
        }
    }

    /// Create an invalid locator error
    pub fn invalid_locator(locator: &str, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether polling the page again could make this error go away
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ElementNotFound { .. } | Error::Assertion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message_carries_both_values() {
        let err = Error::assertion("#phone", "value ''", "value 'abc'");
        let msg = err.to_string();
        assert!(msg.contains("#phone"));
        assert!(msg.contains("value ''"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_only_dom_polling_errors_are_retryable() {
        assert!(Error::element_not_found("#x", "exactly 1", 0).is_retryable());
        assert!(Error::assertion("#x", "a", "b").is_retryable());
        assert!(!Error::option_not_found("#product", "text 'Foo'").is_retryable());
        assert!(!Error::request("http://x", "timeout").is_retryable());
        assert!(!Error::ClockNotInstalled.is_retryable());
    }
}
