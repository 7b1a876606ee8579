use std::env;
use std::fmt;
use std::time::Duration;

use learning_core::video::PlayabilityPolicy;
use reqwest::Url;

use crate::error::ApiError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(1500);

/// Connection settings for the course backend.
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_API_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Reads `LEARN_API_BASE_URL`, `LEARN_API_TOKEN` and `LEARN_API_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("LEARN_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());
        let timeout = lookup("LEARN_API_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_API_TIMEOUT, Duration::from_secs);

        Self {
            base_url,
            token: None,
            timeout,
        }
        .with_token(lookup("LEARN_API_TOKEN"))
    }

    /// Append path segments to the base URL. Each segment is percent-encoded, so an
    /// id can never add path levels or a query.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the base URL cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidBaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Behavioral knobs of the learning session tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    pub auto_advance: bool,
    pub auto_advance_delay: Duration,
    pub playability: PlayabilityPolicy,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            auto_advance: true,
            auto_advance_delay: DEFAULT_AUTO_ADVANCE_DELAY,
            playability: PlayabilityPolicy::Strict,
        }
    }
}

impl TrackerSettings {
    /// Reads `LEARN_AUTO_ADVANCE`, `LEARN_AUTO_ADVANCE_MS` and `LEARN_ALLOW_DIRECT_VIDEO`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let auto_advance = lookup("LEARN_AUTO_ADVANCE")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.auto_advance);
        let auto_advance_delay = lookup("LEARN_AUTO_ADVANCE_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(defaults.auto_advance_delay, Duration::from_millis);
        let playability = match lookup("LEARN_ALLOW_DIRECT_VIDEO").and_then(|v| parse_flag(&v)) {
            Some(true) => PlayabilityPolicy::AllowDirectLinks,
            _ => PlayabilityPolicy::Strict,
        };

        Self {
            auto_advance,
            auto_advance_delay,
            playability,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
