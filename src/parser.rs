//! OTP extraction entry points.
//!
//! [`OtpParser`] is the contract hosts program against. [`PatternOtpParser`] implements it
//! with the configurable pattern tables; [`KeywordOtpParser`](crate::KeywordOtpParser) is
//! the keyword-gated alternative. Both return `None` for the common case of a message that
//! holds no code.
//!
//! # Example
//!
//! ```
//! use otp_extract::{OtpParser, ParsedOtp, PatternOtpParser};
//!
//! let parser = PatternOtpParser::new();
//! assert_eq!(
//!     parser.parse("123-456 is your Resy account verification code."),
//!     Some(ParsedOtp::new(Some("resy"), "123456"))
//! );
//! assert_eq!(parser.parse("See you at 9am!"), None);
//! ```

use crate::candidates;
use crate::config::{ParserConfig, ParserSnapshot};
use crate::context;
use crate::fallback::FallbackParser;
use crate::handle::ConfigHandle;
use crate::matcher::Matcher;
use crate::patterns::VENDOR_CODE_SERVICE;
use crate::service;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// An extracted code and the service it was attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedOtp {
    /// Service that sent the code, when it could be inferred.
    pub service: Option<String>,
    /// The code, exactly as it should be typed.
    pub code: String,
}

impl ParsedOtp {
    /// Creates a result.
    pub fn new(service: Option<&str>, code: impl Into<String>) -> Self {
        Self {
            service: service.map(str::to_string),
            code: code.into(),
        }
    }
}

impl fmt::Display for ParsedOtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            Some(service) => write!(f, "{} ({service})", self.code),
            None => f.write_str(&self.code),
        }
    }
}

/// Extracts a one-time code from message text.
///
/// Implementations are pure with respect to their active configuration: the same message
/// yields the same result until the configuration is replaced.
pub trait OtpParser: Send + Sync {
    /// Returns the code in `message`, or `None` if it holds none.
    fn parse(&self, message: &str) -> Option<ParsedOtp>;

    /// Returns a short name for logging.
    fn name(&self) -> &str;
}

/// Parser driven by a [`ParserConfig`].
///
/// Strategies run in a fixed order and the first that produces a code wins:
///
/// 1. A dotted phone number anywhere rejects the whole message.
/// 2. A vendor code (`G-XXXXX`) is returned as-is, attributed to Google.
/// 3. Custom patterns, in configuration order, with their own service name.
/// 4. Digit runs, split digit groups, then alphanumeric tokens, each checked in context.
/// 5. Digits inside full-width brackets.
/// 6. The [`FallbackParser`]s.
///
/// Steps 4 to 6 attribute the code to the service inferred from the message.
#[derive(Debug, Clone, Default)]
pub struct PatternOtpParser {
    config: ConfigHandle,
}

impl PatternOtpParser {
    /// Creates a parser using the bundled configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser using `config`. Unusable rules are skipped.
    #[must_use]
    pub fn with_config(config: ParserConfig) -> Self {
        Self::with_handle(ConfigHandle::from_config(config))
    }

    /// Creates a parser reading from a shared handle, such as one a
    /// [`ConfigRefresher`](crate::ConfigRefresher) updates.
    #[must_use]
    pub fn with_handle(config: ConfigHandle) -> Self {
        Self { config }
    }

    /// Returns the configuration handle.
    #[must_use]
    pub fn handle(&self) -> &ConfigHandle {
        &self.config
    }

    /// Replaces the active configuration. Parses already running keep the old one.
    pub fn replace_config(&self, config: ParserConfig) {
        self.config.replace(config);
    }

    fn parse_with(snapshot: &ParserSnapshot, message: &str) -> Option<ParsedOtp> {
        let lower = message.to_lowercase();

        if context::contains_phone_number(&lower) {
            debug!("Message contains a phone number, ignoring");
            return None;
        }

        if let Some(code) = candidates::vendor_code(message) {
            debug!(strategy = "vendor", "Found code");
            return Some(ParsedOtp::new(Some(VENDOR_CODE_SERVICE), code));
        }

        let service = service::infer_service(snapshot, &lower);

        let custom = snapshot.custom_rules().iter().find_map(|rule| {
            let code = rule.find_match(&lower)?;
            debug!(strategy = "custom", matcher = %rule.description(), "Found code");
            Some(ParsedOtp::new(rule.service(), code))
        });
        if custom.is_some() {
            return custom;
        }

        if let Some(code) = candidates::standard_code(&lower) {
            debug!(strategy = "standard", service = ?service, "Found code");
            return Some(ParsedOtp { service, code });
        }

        if let Some(code) = candidates::bracket_code(&lower) {
            debug!(strategy = "bracket", service = ?service, "Found code");
            return Some(ParsedOtp { service, code });
        }

        let fallback = FallbackParser::ALL
            .iter()
            .find_map(|parser| parser.try_parse(message, service.as_deref()));
        match &fallback {
            Some(_) => debug!(strategy = "fallback", "Found code"),
            None => debug!("No code found"),
        }
        fallback
    }
}

impl OtpParser for PatternOtpParser {
    #[instrument(
        name = "PatternOtpParser::parse",
        skip_all,
        fields(message_len = message.len())
    )]
    fn parse(&self, message: &str) -> Option<ParsedOtp> {
        let snapshot = self.config.load();
        Self::parse_with(&snapshot, message)
    }

    fn name(&self) -> &str {
        "pattern"
    }
}

impl<P: OtpParser + ?Sized> OtpParser for Arc<P> {
    fn parse(&self, message: &str) -> Option<ParsedOtp> {
        (**self).parse(message)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P: OtpParser + ?Sized> OtpParser for Box<P> {
    fn parse(&self, message: &str) -> Option<ParsedOtp> {
        (**self).parse(message)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
