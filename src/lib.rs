//! # otp-extract
//!
//! Heuristic extraction of one-time passcodes from SMS, chat and email text.
//!
//! This crate provides:
//! - A configurable pattern parser ([`PatternOtpParser`]) that finds the code and names the
//!   service that sent it
//! - A keyword-gated parser ([`KeywordOtpParser`]) with per-language keyword bundles
//! - Custom user patterns that take precedence over the built-in heuristics
//! - Background refresh of the pattern configuration from a remote JSON document
//! - Bookkeeping so each incoming message is parsed only once
//!
//! ## Quick Start
//!
//! ```
//! use otp_extract::{OtpParser, ParsedOtp, PatternOtpParser};
//!
//! let parser = PatternOtpParser::new();
//!
//! let otp = parser.parse("Your Lyft code is 744444").unwrap();
//! assert_eq!(otp, ParsedOtp::new(Some("lyft"), "744444"));
//!
//! // Most messages hold no code at all
//! assert_eq!(parser.parse("Running 10 minutes late"), None);
//! ```
//!
//! ## Custom Patterns
//!
//! A custom pattern pairs a matcher with an optional extractor. When the extractor is blank
//! the matcher's first capture group is the code.
//!
//! ```
//! use otp_extract::{CustomPatternConfig, OtpParser, ParserConfig, PatternOtpParser};
//!
//! # fn example() -> otp_extract::Result<()> {
//! let config = ParserConfig::builder()
//!     .custom_pattern(CustomPatternConfig::new(
//!         Some("acme"),
//!         r"^acme login",
//!         r"token ([a-z0-9]{6})",
//!     ))
//!     .build()?;
//!
//! let parser = PatternOtpParser::with_config(config);
//! let otp = parser.parse("ACME login token x7y8z9").unwrap();
//! assert_eq!(otp.code, "x7y8z9");
//! assert_eq!(otp.service.as_deref(), Some("acme"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Remote Configuration
//!
//! ```no_run
//! use otp_extract::{ConfigHandle, ConfigRefresher, PatternOtpParser, RefreshConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> otp_extract::Result<()> {
//! let settings = RefreshConfig::builder()
//!     .cache_path("config-cache.json")
//!     .build()?;
//!
//! let handle = ConfigHandle::default();
//! let refresher = Arc::new(ConfigRefresher::new(settings, handle.clone()));
//! refresher.load_initial().await;
//! let worker = Arc::clone(&refresher).spawn();
//!
//! // Parsers sharing the handle pick up every refreshed configuration
//! let parser = PatternOtpParser::with_handle(handle);
//! # drop(parser);
//! # worker.abort();
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Parsing never fails, it returns `None`. Configuration and refresh operations return
//! [`Result`]. Use [`Error::is_retryable`] to decide whether a refresh is worth retrying:
//!
//! ```
//! use otp_extract::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_retryable() {
//!         println!("Transient error, will retry: {}", error);
//!     } else {
//!         println!("Permanent error: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Without a subscriber the spans are no-ops.
//!
//! ### Span Naming Convention
//!
//! - `PatternOtpParser::parse` - Pattern parser
//! - `KeywordOtpParser::parse` - Keyword parser
//! - `ConfigRefresher::load_initial` - Startup configuration load
//! - `ConfigRefresher::refresh` - Remote configuration fetch
//!
//! ### Standard Fields
//!
//! - `message_len` - Length of the parsed message in bytes (message text is never logged)
//! - `strategy` - Extraction strategy that produced the code
//! - `url` - Remote configuration URL
//! - `category` - [`ErrorCategory`] of a failed refresh

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod fallback;
pub mod handle;
pub mod keyword;
pub mod matcher;
pub mod message;
pub mod parser;
pub mod patterns;
pub mod refresh;

// Internal modules
mod candidates;
mod context;
mod service;

// Re-exports for ergonomic API
pub use config::{
    CustomPatternConfig, CustomRule, ParserConfig, ParserConfigBuilder, ParserSnapshot,
};
pub use error::{Error, ErrorCategory, Result};
pub use handle::ConfigHandle;
pub use keyword::{KeywordOtpParser, KeywordSet, LanguageBundle};
pub use message::{is_plausible_otp_text, MessageTracker, RawMessage};
pub use parser::{OtpParser, ParsedOtp, PatternOtpParser};
pub use refresh::{
    ConfigOrigin, ConfigRefresher, RefreshConfig, RefreshConfigBuilder, DEFAULT_CONFIG_URL,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // Ensure all public types are accessible
        let _ = ParserConfig::builder();
        let _ = RefreshConfig::builder();
        let _ = ConfigHandle::default();
        let _ = MessageTracker::new();
        let _ = KeywordOtpParser::new();
        let _ = matcher::PatternRule::new(r"(\d{6})", 1).unwrap();
    }

    #[test]
    fn test_parsers_interchangeable() {
        let parsers: Vec<Box<dyn OtpParser>> = vec![
            Box::new(PatternOtpParser::new()),
            Box::new(KeywordOtpParser::new()),
        ];
        for parser in &parsers {
            let otp = parser.parse("Your verification code is 482913.");
            assert_eq!(otp.map(|otp| otp.code).as_deref(), Some("482913"), "{}", parser.name());
        }
    }
}
