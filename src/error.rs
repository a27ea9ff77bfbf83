//! Error types for the otp-extract crate.
//!
//! Extraction itself never fails: [`OtpParser::parse`](crate::OtpParser::parse) returns
//! `None` when no code is found and skips rules it cannot use. These errors surface from
//! the configuration side (building rules, decoding documents, fetching updates) and from
//! message adapters. See [`Error::is_retryable`] for the retry classification.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or refreshing the extraction engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Rule / configuration errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// A regular expression failed to compile.
    #[error("invalid pattern '{pattern}'")]
    InvalidPattern {
        /// The pattern source as written in the configuration.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A rule references a capture group its pattern does not have.
    #[error("pattern '{pattern}' has no capture group {group}")]
    MissingCaptureGroup {
        /// The pattern source.
        pattern: String,
        /// The capture group index the rule expects.
        group: usize,
    },

    /// Invalid settings provided.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Document errors (NOT retryable - the same bytes decode the same way)
    // ─────────────────────────────────────────────────────────────────────────
    /// A configuration or language document could not be decoded.
    #[error("failed to decode configuration document")]
    DecodeConfig {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A configuration could not be encoded.
    #[error("failed to encode configuration document")]
    EncodeConfig {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A raw message could not be parsed.
    #[error("failed to parse message")]
    ParseMessage {
        /// The underlying parse error.
        #[source]
        source: mailparse::MailParseError,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Local cache errors (NOT retryable)
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to read the cached configuration.
    #[error("failed to read configuration cache {}", .path.display())]
    ReadCache {
        /// The cache file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the cached configuration.
    #[error("failed to write configuration cache {}", .path.display())]
    WriteCache {
        /// The cache file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Remote fetch errors (RETRYABLE on the next refresh)
    // ─────────────────────────────────────────────────────────────────────────
    /// The HTTP request for the remote configuration failed.
    #[error("failed to fetch configuration from {url}")]
    FetchConfig {
        /// The configuration URL.
        url: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote configuration answered with a non-200 status.
    #[error("configuration fetch from {url} returned HTTP {status}")]
    FetchStatus {
        /// The configuration URL.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },

    /// The remote configuration did not answer in time.
    #[error("configuration fetch from {url} timed out after {timeout:?}")]
    FetchTimeout {
        /// The configuration URL.
        url: String,
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Another refresh is already running.
    #[error("a configuration refresh is already in progress")]
    RefreshInProgress,

    /// The background task compiling a configuration was cancelled, usually because the
    /// runtime is shutting down.
    #[error("configuration compile task did not complete")]
    CompileAborted {
        /// The underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl Error {
    /// Returns `true` if this error represents a transient failure that might succeed on
    /// the next scheduled refresh.
    ///
    /// ```
    /// use otp_extract::Error;
    ///
    /// assert!(Error::RefreshInProgress.is_retryable());
    /// assert!(!Error::InvalidConfig { message: "bad".into() }.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::FetchConfig { .. }
            | Error::FetchTimeout { .. }
            | Error::RefreshInProgress
            | Error::CompileAborted { .. } => true,

            // Server-side trouble may clear up; client errors will not.
            Error::FetchStatus { status, .. } => *status >= 500 || *status == 429,

            Error::InvalidPattern { .. }
            | Error::MissingCaptureGroup { .. }
            | Error::InvalidConfig { .. }
            | Error::DecodeConfig { .. }
            | Error::EncodeConfig { .. }
            | Error::ParseMessage { .. }
            | Error::ReadCache { .. }
            | Error::WriteCache { .. } => false,
        }
    }

    /// Returns the error category for metrics/logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidPattern { .. }
            | Error::MissingCaptureGroup { .. }
            | Error::InvalidConfig { .. } => ErrorCategory::Configuration,

            Error::DecodeConfig { .. } | Error::EncodeConfig { .. } | Error::ParseMessage { .. } => {
                ErrorCategory::Decode
            }

            Error::ReadCache { .. } | Error::WriteCache { .. } => ErrorCategory::Io,

            Error::FetchConfig { .. } | Error::FetchStatus { .. } => ErrorCategory::Network,

            Error::FetchTimeout { .. } => ErrorCategory::Timeout,

            Error::RefreshInProgress | Error::CompileAborted { .. } => ErrorCategory::Busy,
        }
    }
}

/// Error categories for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid rules or settings.
    Configuration,
    /// Malformed documents or messages.
    Decode,
    /// Local cache file errors.
    Io,
    /// Network errors while fetching configuration.
    Network,
    /// Timeout errors.
    Timeout,
    /// A concurrent operation is already running.
    Busy,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Decode => write!(f, "decode"),
            ErrorCategory::Io => write!(f, "io"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Busy => write!(f, "busy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_error() -> Error {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        Error::DecodeConfig { source }
    }

    #[test]
    fn test_retryable_classification() {
        // Rule errors are not retryable
        let err = Error::MissingCaptureGroup {
            pattern: "abc".into(),
            group: 1,
        };
        assert!(!err.is_retryable());

        // A bad document stays bad
        assert!(!decode_error().is_retryable());

        // Timeouts and overlapping refreshes clear up on the next cycle
        let err = Error::FetchTimeout {
            url: "https://example.com/config.json".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(err.is_retryable());
        assert!(Error::RefreshInProgress.is_retryable());
    }

    #[test]
    fn test_status_retryability() {
        let status = |status| Error::FetchStatus {
            url: "https://example.com/config.json".into(),
            status,
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn test_error_categories() {
        let err = Error::InvalidConfig {
            message: "zero interval".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);

        assert_eq!(decode_error().category(), ErrorCategory::Decode);

        let err = Error::WriteCache {
            path: PathBuf::from("/tmp/config.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.category(), ErrorCategory::Io);

        assert_eq!(Error::RefreshInProgress.category(), ErrorCategory::Busy);
    }

    #[tokio::test]
    async fn test_aborted_compile_is_busy() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let source = task.await.unwrap_err();
        assert!(source.is_cancelled());

        let err = Error::CompileAborted { source };
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Busy);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Network.to_string(), "network");
        assert_eq!(ErrorCategory::Busy.to_string(), "busy");
    }

    #[test]
    fn test_cache_error_mentions_path() {
        let err = Error::ReadCache {
            path: PathBuf::from("/var/cache/otp.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/var/cache/otp.json"));
    }
}
