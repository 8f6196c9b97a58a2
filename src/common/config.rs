//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Page under test
    #[serde(default)]
    pub site: SiteConfig,

    /// Polling settings for locator queries and assertions
    #[serde(default)]
    pub retry: RetryConfig,

    /// Keystroke settings
    #[serde(default)]
    pub typing: TypingConfig,

    /// Fixture file settings
    #[serde(default)]
    pub fixtures: FixtureConfig,

    /// External request settings
    #[serde(default)]
    pub request: RequestConfig,
}

/// Page under test settings
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Prefix stripped from visited URLs before they are resolved
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost/".to_string()
}

/// Polling settings in milliseconds
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// How long a locator or assertion is retried before failing
    #[serde(default = "default_retry_timeout")]
    pub timeout_ms: u64,

    /// Pause between two attempts
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_retry_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_retry_timeout() -> u64 {
    4_000
}
fn default_poll_interval() -> u64 {
    50
}

/// Keystroke settings
#[derive(Debug, Deserialize, Clone)]
pub struct TypingConfig {
    /// Delay between two keystrokes when a step doesn't set one (0 disables)
    #[serde(default = "default_key_delay")]
    pub delay_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_key_delay(),
        }
    }
}

fn default_key_delay() -> u64 {
    10
}

/// Fixture settings
#[derive(Debug, Deserialize, Clone)]
pub struct FixtureConfig {
    /// Fixture directory, relative to the suite file
    #[serde(default = "default_fixtures_dir")]
    pub dir: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dir: default_fixtures_dir(),
        }
    }
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from("fixtures")
}

/// External request settings
#[derive(Debug, Deserialize, Clone)]
pub struct RequestConfig {
    /// Timeout for the single request attempt
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment
    #[serde(default = "default_use_system_proxy")]
    pub use_system_proxy: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_request_timeout(),
            use_system_proxy: default_use_system_proxy(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}
fn default_use_system_proxy() -> bool {
    true
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.retry.poll_interval_ms == 0 {
            return Err(super::Error::ConfigParse(
                "retry.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.retry.timeout_ms, 4_000);
        assert_eq!(config.retry.poll_interval_ms, 50);
        assert_eq!(config.typing.delay_ms, 10);
        assert_eq!(config.fixtures.dir, PathBuf::from("fixtures"));
        assert!(config.request.use_system_proxy);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r##"
[retry]
timeout_ms = 250

[typing]
delay_ms = 0
"##,
        )
        .unwrap();
        assert_eq!(config.retry.timeout(), Duration::from_millis(250));
        assert_eq!(config.retry.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.typing.delay_ms, 0);
        assert_eq!(config.request.timeout_secs, 30);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = Config::parse("[retry]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }
}
