use std::time::Duration;

use url::Url;

use crate::{ApiError, FailureKind};

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Everything the client components need, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub connect_timeout: Duration,
    /// Applies to every request except the log stream, which is long-lived.
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub files_refresh_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            files_refresh_interval: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn from_base_url(raw: &str) -> Result<Self, ApiError> {
        parse_base_url(raw).map(Self::new)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_base_url(DEFAULT_BASE_URL).expect("default base url is valid")
    }
}

/// Parses a base URL, accepting only http(s) origins that can carry a path.
pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ApiError::new(FailureKind::InvalidUrl, format!("{raw}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ApiError::new(
            FailureKind::InvalidUrl,
            format!("{raw}: expected an http(s) base url"),
        ));
    }
    Ok(url)
}

/// Shortest wait between log stream reconnects, whatever the server hints.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(10);

/// Exponential backoff for re-opening the log stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Give up after this many consecutive failures; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Next delay after `current`, kept within [`Self::bounded`].
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        self.bounded(Duration::from_millis(next_ms))
    }

    /// Clamps `delay` to `max_delay`, never below [`MIN_RECONNECT_DELAY`].
    pub fn bounded(&self, delay: Duration) -> Duration {
        delay.min(self.max_delay).max(MIN_RECONNECT_DELAY)
    }

    pub fn allows_attempt(&self, consecutive_failures: u32) -> bool {
        self.max_attempts
            .map_or(true, |max| consecutive_failures <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_backoff_sequence() {
        let policy = ReconnectPolicy::default();
        let mut delay = policy.initial_delay;
        let expected = [1, 2, 4, 8, 16, 30, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = policy.next_delay(delay);
        }
    }

    #[test]
    fn zero_delays_still_back_off() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::ZERO,
            ..ReconnectPolicy::default()
        };
        let first = policy.bounded(policy.initial_delay);
        assert_eq!(first, MIN_RECONNECT_DELAY);
        assert_eq!(policy.next_delay(first), MIN_RECONNECT_DELAY * 2);
        assert_eq!(policy.next_delay(Duration::ZERO), MIN_RECONNECT_DELAY);
        assert_eq!(
            policy.bounded(Duration::from_secs(90)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn attempt_limit_is_inclusive() {
        let policy = ReconnectPolicy {
            max_attempts: Some(2),
            ..ReconnectPolicy::default()
        };
        assert!(policy.allows_attempt(1));
        assert!(policy.allows_attempt(2));
        assert!(!policy.allows_attempt(3));
        assert!(ReconnectPolicy::default().allows_attempt(u32::MAX));
    }

    #[test]
    fn default_config_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.files_refresh_interval, Duration::from_secs(10));
    }

    #[test]
    fn rejects_non_http_base_urls() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("mailto:someone@example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url(" https://api.example.com/prefix ").is_ok());
    }
}
