//! Bounded retry for DOM queries and assertions

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::common::config::RetryConfig;

/// A deadline and the interval between polls
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    deadline: Instant,
    poll_interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            poll_interval,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.timeout(), config.poll_interval())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Sleep one poll interval, never past the deadline
    pub async fn pause(&self) {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        sleep(self.poll_interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_timeout() {
        let wait = Wait::new(Duration::from_millis(100), Duration::from_millis(40));
        let mut polls = 0;
        while !wait.expired() {
            wait.pause().await;
            polls += 1;
        }
        assert_eq!(polls, 3);
    }

    #[tokio::test]
    async fn test_zero_timeout_is_expired_immediately() {
        let wait = Wait::new(Duration::ZERO, Duration::from_millis(50));
        assert!(wait.expired());
    }
}
