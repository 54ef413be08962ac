//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{UnlurkError, UnlurkResult};

/// Resolver and service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlurkConfig {
    /// Listing page scraped for second-chance times.
    #[serde(default = "default_front_page_url")]
    pub front_page_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How long a scraped listing stays valid, in seconds.
    #[serde(default = "default_front_page_ttl")]
    pub front_page_ttl_secs: u64,

    /// Drift (seconds) above which the listing's absolute timestamp is distrusted.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold_secs: u64,

    /// How far back candidate roots are considered before max-age filtering, in seconds.
    ///
    /// Needs to be long: a story pulled from the second-chance pool can be days old.
    #[serde(default = "default_lookback")]
    pub lookback_secs: u64,
}

fn default_front_page_url() -> String {
    "https://news.ycombinator.com".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_front_page_ttl() -> u64 {
    60
}

fn default_drift_threshold() -> u64 {
    2 * 60 * 60
}

fn default_lookback() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for UnlurkConfig {
    fn default() -> Self {
        Self {
            front_page_url: default_front_page_url(),
            timeout_secs: default_timeout(),
            front_page_ttl_secs: default_front_page_ttl(),
            drift_threshold_secs: default_drift_threshold(),
            lookback_secs: default_lookback(),
        }
    }
}

impl UnlurkConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `UNLURK_FRONT_PAGE_URL` | Listing page URL |
    /// | `UNLURK_TIMEOUT` | Request timeout in seconds |
    /// | `UNLURK_FRONT_PAGE_TTL` | Listing cache lifetime in seconds |
    /// | `UNLURK_DRIFT_THRESHOLD` | Drift threshold in seconds |
    /// | `UNLURK_LOOKBACK` | Candidate lookback in seconds |
    pub fn from_env() -> Self {
        fn secs(var: &str, default: fn() -> u64) -> u64 {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default)
        }

        Self {
            front_page_url: std::env::var("UNLURK_FRONT_PAGE_URL")
                .unwrap_or_else(|_| default_front_page_url()),
            timeout_secs: secs("UNLURK_TIMEOUT", default_timeout),
            front_page_ttl_secs: secs("UNLURK_FRONT_PAGE_TTL", default_front_page_ttl),
            drift_threshold_secs: secs("UNLURK_DRIFT_THRESHOLD", default_drift_threshold),
            lookback_secs: secs("UNLURK_LOOKBACK", default_lookback),
        }
    }

    /// Set the listing URL.
    pub fn with_front_page_url(mut self, url: impl Into<String>) -> Self {
        self.front_page_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_front_page_ttl_secs(mut self, secs: u64) -> Self {
        self.front_page_ttl_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn front_page_ttl(&self) -> Duration {
        Duration::from_secs(self.front_page_ttl_secs)
    }

    pub fn drift_threshold(&self) -> Duration {
        Duration::from_secs(self.drift_threshold_secs)
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> UnlurkResult<()> {
        if !self.front_page_url.starts_with("http://") && !self.front_page_url.starts_with("https://")
        {
            return Err(UnlurkError::Config {
                message: format!("front page url must be http(s): {}", self.front_page_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(UnlurkError::Config {
                message: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}
