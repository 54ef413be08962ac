//! Error types for activity resolution.

use std::time::Duration;

/// Unlurk errors.
///
/// `Clone` so a single coalesced fetch can hand the same failure to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnlurkError {
    /// Caller-supplied parameters were malformed.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Item not found in the item source.
    #[error("item not found: {id}")]
    NotFound { id: u64 },

    /// Upstream (item source or listing page) unreachable or returned a non-success status.
    #[error("upstream fetch failed: {message}")]
    UpstreamFetchFailed { message: String },

    /// A fragment that was present did not have the expected shape.
    #[error("parse failed: {message}")]
    ParseFailed { message: String },

    /// The in-flight operation exceeded its deadline.
    #[error("cancelled after {after:?}")]
    Cancelled { after: Duration },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl UnlurkError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } => 1,
            Self::Config { .. } => 1,
            Self::NotFound { .. } => 1,

            // Network/transient
            Self::UpstreamFetchFailed { .. } => 5,
            Self::Cancelled { .. } => 5,

            Self::ParseFailed { .. } => 6,
        }
    }

    /// Whether a front-page resolution failure may be recovered by degrading to raw item times.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamFetchFailed { .. } | Self::ParseFailed { .. } | Self::Cancelled { .. }
        )
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::ParseFailed {
            message: message.into(),
        }
    }

    pub(crate) fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamFetchFailed {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for UnlurkError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamFetchFailed {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for UnlurkError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseFailed {
            message: err.to_string(),
        }
    }
}

/// Result type for unlurk operations.
pub type UnlurkResult<T> = Result<T, UnlurkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradable_errors() {
        assert!(UnlurkError::upstream("HTTP 503").is_degradable());
        assert!(UnlurkError::parse("bad age").is_degradable());
        assert!(UnlurkError::Cancelled {
            after: Duration::from_secs(1)
        }
        .is_degradable());
        assert!(!UnlurkError::NotFound { id: 1 }.is_degradable());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(UnlurkError::NotFound { id: 7 }.exit_code(), 1);
        assert_eq!(UnlurkError::upstream("down").exit_code(), 5);
        assert_eq!(UnlurkError::parse("x").exit_code(), 6);
    }
}
