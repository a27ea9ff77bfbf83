//! Parser configuration and its compiled snapshot.
//!
//! [`ParserConfig`] is the serializable document (the same JSON shape the remote
//! configuration uses). [`ParserSnapshot`] is its compiled, immutable form, the unit the
//! parser reads and the [`ConfigHandle`](crate::ConfigHandle) swaps.
//!
//! ```
//! use otp_extract::{CustomPatternConfig, ParserConfig};
//!
//! let config = ParserConfig::builder()
//!     .custom_pattern(CustomPatternConfig::new(
//!         Some("acme"),
//!         r"^acme-.+$",
//!         r":(\w{6})$",
//!     ))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.custom_patterns.len(), 1);
//! ```

use crate::error::{Error, Result};
use crate::matcher::{compile_pattern, Matcher, PatternRule};
use crate::patterns;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::warn;

/// Placeholder some documents use in `serviceName` to mean "no service".
const NO_PROVIDER_SENTINEL: &str = "no provider name";

/// Serializable parser configuration.
///
/// List order is significant throughout: the first matching service pattern and the first
/// matching custom pattern win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParserConfig {
    /// Regex sources whose first capture group names the service.
    pub service_patterns: Vec<String>,
    /// Service names scanned for as substrings when no pattern names one.
    pub known_services: Vec<String>,
    /// Exact message templates that take precedence over the generic strategies.
    #[serde(default)]
    pub custom_patterns: Vec<CustomPatternConfig>,
}

impl Default for ParserConfig {
    /// The bundled configuration: every default service pattern and known service, no
    /// custom patterns.
    fn default() -> Self {
        Self {
            service_patterns: patterns::SERVICE_PATTERNS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            known_services: patterns::KNOWN_SERVICES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            custom_patterns: Vec::new(),
        }
    }
}

impl ParserConfig {
    /// Creates a builder seeded with the bundled tables.
    #[must_use]
    pub fn builder() -> ParserConfigBuilder {
        ParserConfigBuilder::default()
    }

    /// Decodes a configuration document.
    ///
    /// `servicePatterns` and `knownServices` are required; `customPatterns` may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeConfig`] if the bytes are not a valid document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::DecodeConfig { source })
    }

    /// Encodes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodeConfig`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| Error::EncodeConfig { source })
    }

    /// Checks that every pattern compiles and exposes the capture group it needs.
    ///
    /// Decoded documents are not required to pass this; unusable rules are skipped when
    /// the configuration is compiled.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::InvalidPattern`] or [`Error::MissingCaptureGroup`].
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.service_patterns {
            PatternRule::new(pattern, 1)?;
        }
        for custom in &self.custom_patterns {
            CustomRule::compile(custom)?;
        }
        Ok(())
    }
}

/// A configured exact template for one class of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPatternConfig {
    /// Service to report, verbatim. Blank or `"no provider name"` means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Pattern the lower-cased message must match.
    pub matcher_pattern: String,
    /// Pattern whose first group is the code. Blank reuses the matcher's first group.
    pub code_extractor_pattern: String,
}

impl CustomPatternConfig {
    /// Creates a custom pattern.
    pub fn new(
        service_name: Option<&str>,
        matcher_pattern: impl Into<String>,
        code_extractor_pattern: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.map(str::to_string),
            matcher_pattern: matcher_pattern.into(),
            code_extractor_pattern: code_extractor_pattern.into(),
        }
    }

    /// Returns the effective service name, treating the "no service" sentinels as absent.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.service_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case(NO_PROVIDER_SENTINEL))
    }
}

/// Builder for [`ParserConfig`].
#[derive(Debug, Default)]
pub struct ParserConfigBuilder {
    service_patterns: Option<Vec<String>>,
    known_services: Option<Vec<String>>,
    extra_known_services: Vec<String>,
    custom_patterns: Vec<CustomPatternConfig>,
}

impl ParserConfigBuilder {
    /// Replaces the service pattern list.
    #[must_use]
    pub fn service_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the known service list.
    #[must_use]
    pub fn known_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_services = Some(services.into_iter().map(Into::into).collect());
        self
    }

    /// Appends one known service after the current list.
    #[must_use]
    pub fn known_service(mut self, service: impl Into<String>) -> Self {
        self.extra_known_services.push(service.into());
        self
    }

    /// Appends a custom pattern. Custom patterns are tried in the order added.
    #[must_use]
    pub fn custom_pattern(mut self, pattern: CustomPatternConfig) -> Self {
        self.custom_patterns.push(pattern);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern does not compile or lacks its capture group.
    pub fn build(self) -> Result<ParserConfig> {
        let defaults = ParserConfig::default();
        let mut known_services = self.known_services.unwrap_or(defaults.known_services);
        known_services.extend(self.extra_known_services);

        let config = ParserConfig {
            service_patterns: self.service_patterns.unwrap_or(defaults.service_patterns),
            known_services,
            custom_patterns: self.custom_patterns,
        };
        config.validate()?;
        Ok(config)
    }
}

/// A compiled custom pattern.
#[derive(Debug, Clone)]
pub struct CustomRule {
    service: Option<String>,
    matcher: PatternRule,
    extractor: Option<PatternRule>,
    description: String,
}

impl CustomRule {
    /// Compiles a custom pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile, or if the rule has no first capture
    /// group to take the code from.
    pub fn compile(config: &CustomPatternConfig) -> Result<Self> {
        let matcher_regex = compile_pattern(&config.matcher_pattern)?;
        let (matcher, extractor) = if config.code_extractor_pattern.trim().is_empty() {
            (PatternRule::from_regex(matcher_regex, 1)?, None)
        } else {
            (
                PatternRule::from_regex(matcher_regex, 0)?,
                Some(PatternRule::new(&config.code_extractor_pattern, 1)?),
            )
        };

        let service = config.service().map(str::to_string);
        let description = match &service {
            Some(service) => format!("custom pattern for {service}"),
            None => format!("custom pattern {}", config.matcher_pattern),
        };

        Ok(Self {
            service,
            matcher,
            extractor,
            description,
        })
    }

    /// Returns the service this rule reports, if any.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }
}

impl Matcher for CustomRule {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        let code = match &self.extractor {
            Some(extractor) => {
                if !self.matcher.is_match(text) {
                    return None;
                }
                extractor.capture(text)
            }
            None => self.matcher.capture(text),
        }?;

        (!code.is_empty()).then_some(Cow::Borrowed(code))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// The compiled, immutable form of a [`ParserConfig`].
///
/// Compilation never fails: rules that cannot be used are logged and left out.
#[derive(Debug)]
pub struct ParserSnapshot {
    config: ParserConfig,
    service_rules: Vec<PatternRule>,
    known_services: Vec<String>,
    custom_rules: Vec<CustomRule>,
    skipped_rules: usize,
}

static BUNDLED: LazyLock<Arc<ParserSnapshot>> =
    LazyLock::new(|| Arc::new(ParserSnapshot::compile(ParserConfig::default())));

impl ParserSnapshot {
    /// Compiles a configuration, skipping unusable rules.
    #[must_use]
    pub fn compile(config: ParserConfig) -> Self {
        let mut skipped_rules = 0;

        let service_rules = config
            .service_patterns
            .iter()
            .filter_map(|pattern| match PatternRule::new(pattern, 1) {
                Ok(rule) => Some(rule),
                Err(error) => {
                    warn!(pattern = %pattern, error = %error, "Skipping unusable service pattern");
                    skipped_rules += 1;
                    None
                }
            })
            .collect();

        let custom_rules = config
            .custom_patterns
            .iter()
            .filter_map(|custom| match CustomRule::compile(custom) {
                Ok(rule) => Some(rule),
                Err(error) => {
                    warn!(
                        matcher = %custom.matcher_pattern,
                        extractor = %custom.code_extractor_pattern,
                        error = %error,
                        "Skipping unusable custom pattern"
                    );
                    skipped_rules += 1;
                    None
                }
            })
            .collect();

        let mut seen = HashSet::new();
        let known_services = config
            .known_services
            .iter()
            .map(|service| service.trim().to_lowercase())
            .filter(|service| !service.is_empty() && seen.insert(service.clone()))
            .collect();

        Self {
            config,
            service_rules,
            known_services,
            custom_rules,
            skipped_rules,
        }
    }

    /// Returns the snapshot of the bundled configuration, compiled once per process.
    #[must_use]
    pub fn bundled() -> Arc<Self> {
        Arc::clone(&BUNDLED)
    }

    /// Returns the configuration this snapshot was compiled from.
    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Returns the usable service rules, in priority order.
    #[must_use]
    pub fn service_rules(&self) -> &[PatternRule] {
        &self.service_rules
    }

    /// Returns the lower-cased, de-duplicated known services, in priority order.
    #[must_use]
    pub fn known_services(&self) -> &[String] {
        &self.known_services
    }

    /// Returns the usable custom rules, in priority order.
    #[must_use]
    pub fn custom_rules(&self) -> &[CustomRule] {
        &self.custom_rules
    }

    /// Returns how many configured rules were left out as unusable.
    #[must_use]
    pub fn skipped_rules(&self) -> usize {
        self.skipped_rules
    }
}
