//! External request probe
//!
//! Issues a single GET outside the page context and checks status code,
//! status text and body. There is no retry: the first response decides.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::config::RequestConfig;
use crate::common::{Error, Result};

/// Status required when a request step sets no expectations
pub const DEFAULT_STATUS: u16 = 200;

/// Expectations for a response
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ResponseExpectation {
    /// Expected status code
    pub status: Option<u16>,
    /// Expected status text (e.g., "OK")
    pub status_text: Option<String>,
    /// Substring that should be in the body
    pub body_contains: Option<String>,
}

/// What came back from the endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ResponseSummary {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl ResponseExpectation {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.status_text.is_none() && self.body_contains.is_none()
    }

    /// Compare `response` against every expectation set
    ///
    /// With nothing set, the response must be `200 OK`.
    pub fn check(&self, response: &ResponseSummary) -> Result<()> {
        let status = match self.status {
            None if self.is_empty() => Some(DEFAULT_STATUS),
            status => status,
        };
        if let Some(expected) = status {
            if response.status != expected {
                return Err(Error::request(
                    &response.url,
                    format!("expected status {}, got {}", expected, response.status),
                ));
            }
        }

        if let Some(expected) = &self.status_text {
            if &response.status_text != expected {
                return Err(Error::request(
                    &response.url,
                    format!(
                        "expected status text '{}', got '{}'",
                        expected, response.status_text
                    ),
                ));
            }
        }

        if let Some(expected) = &self.body_contains {
            if !response.body.contains(expected.as_str()) {
                return Err(Error::request(
                    &response.url,
                    format!(
                        "expected body containing '{}', got '{}'",
                        expected,
                        truncate(&response.body, 200)
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// HTTP client for `request` steps
#[derive(Debug, Clone)]
pub struct RequestProbe {
    client: reqwest::Client,
}

impl RequestProbe {
    pub fn new(config: &RequestConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Single GET attempt
    pub async fn get(&self, url: &str) -> Result<ResponseSummary> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::request(url, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::request(url, format!("failed to read body: {}", e)))?;

        debug!(url, status = status.as_u16(), bytes = body.len(), "response");

        Ok(ResponseSummary {
            url: url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", s.chars().take(max).collect::<String>())
    } else {
        s.to_string()
    }
}
