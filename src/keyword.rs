//! Keyword-gated extraction engine.
//!
//! [`KeywordOtpParser`] is a lighter alternative to
//! [`PatternOtpParser`](crate::PatternOtpParser) for hosts without a structured
//! configuration. It only looks at messages containing an OTP keyword from one of the
//! loaded [`LanguageBundle`]s, then takes the first candidate that survives the ignore
//! filter (phone numbers, money, times, dates).
//!
//! ```
//! use otp_extract::{KeywordOtpParser, OtpParser};
//!
//! let parser = KeywordOtpParser::new();
//! let parsed = parser.parse("验证码：582913，五分钟内有效").unwrap();
//! assert_eq!(parsed.code, "582913");
//!
//! // No keyword, no extraction
//! assert_eq!(parser.parse("Flight 4821 boards at gate 12"), None);
//! ```

use crate::candidates;
use crate::error::{Error, Result};
use crate::matcher::PatternRule;
use crate::parser::{OtpParser, ParsedOtp};
use crate::patterns::{self, DATE_TIME_SUFFIXES, VENDOR_CODE_SERVICE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

/// Language bundles compiled into the crate.
const BUNDLED_LANGUAGES: [(&str, &str); 6] = [
    ("en", include_str!("../languages/en.json")),
    ("zh", include_str!("../languages/zh.json")),
    ("de", include_str!("../languages/de.json")),
    ("es", include_str!("../languages/es.json")),
    ("fr", include_str!("../languages/fr.json")),
    ("ru", include_str!("../languages/ru.json")),
];

/// Words that are never a service name.
const COMMON_WORDS: &[&str] = &[
    "your", "the", "a", "an", "is", "this", "that", "here", "use", "enter", "please", "do", "not",
    "share", "will", "be", "valid", "only", "sent",
];

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4,8})\b").expect("digits regex"));

static SPACED_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{3}[\s\-]\d{3,6})\b").expect("spaced digits regex"));

static ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]*\d[A-Za-z0-9]{3,7})\b").expect("alphanumeric regex")
});

/// Matches whose text disqualifies any candidate it contains.
static IGNORE_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // Phone numbers
        Regex::new(r"\b(\d{3})[.\-](\d{3})[.\-](\d{4})\b").expect("phone regex"),
        // Money
        Regex::new(r"\$\d+").expect("money regex"),
        // Times
        Regex::new(r"(?i)\b\d+\s*(am|pm)\b").expect("time regex"),
        // Dates
        Regex::new(r"(?i)\b\d+\s*(st|nd|rd|th)\b").expect("date regex"),
    ]
});

/// Service name patterns anchored at the start of the message.
static LEADING_SERVICE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"^\[([^\]\d]{3,})\]").expect("bracket service regex"),
        Regex::new(r"^\(([^)\d]{3,})\)").expect("paren service regex"),
        Regex::new(r"^welcome\s+to\s+([\w\d ]{4,}?)[\s,;.]").expect("welcome regex"),
    ]
});

/// "from X" and "code for X" phrasings.
static PHRASE_SERVICE: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"from\s+([a-z0-9 ]+?)(?:\s|$)").expect("from regex"),
        Regex::new(r"(?:verification|code|otp|pin)\s+(?:for|from)\s+([a-z0-9 ]+?)(?:\s|$)")
            .expect("code for regex"),
    ]
});

/// Keywords and code patterns for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageBundle {
    /// Words whose presence marks a message as a likely OTP.
    pub keywords: Vec<String>,
    /// Regex sources whose first capture group is the code.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl LanguageBundle {
    /// Decodes a language bundle document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeConfig`] if the bytes are not a valid bundle.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::DecodeConfig { source })
    }
}

/// The union of loaded language bundles.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    keywords: Vec<String>,
    patterns: Vec<PatternRule>,
}

impl KeywordSet {
    /// Loads every bundled language.
    #[must_use]
    pub fn bundled() -> Self {
        let mut set = Self::default();
        for (language, document) in BUNDLED_LANGUAGES {
            match LanguageBundle::from_json(document.as_bytes()) {
                Ok(bundle) => set.add_bundle(&bundle),
                Err(error) => warn!(language, error = %error, "Skipping language bundle"),
            }
        }
        set
    }

    /// Adds a bundle's keywords and patterns. Patterns that cannot be used are skipped.
    pub fn add_bundle(&mut self, bundle: &LanguageBundle) {
        for keyword in &bundle.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }

        for pattern in &bundle.patterns {
            match PatternRule::new(pattern, 1) {
                Ok(rule) => self.patterns.push(rule),
                Err(error) => warn!(pattern = %pattern, error = %error, "Skipping language pattern"),
            }
        }
    }

    /// Returns the lower-cased keywords.
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the language-specific code patterns, in load order.
    #[must_use]
    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    /// Returns `true` if the lower-cased `text` contains any keyword.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword.as_str()))
    }

    fn is_keyword(&self, word: &str) -> bool {
        self.keywords.iter().any(|keyword| keyword == word)
    }
}

/// Keyword-gated parser.
#[derive(Debug, Clone)]
pub struct KeywordOtpParser {
    keywords: KeywordSet,
    known_services: Vec<String>,
}

impl Default for KeywordOtpParser {
    fn default() -> Self {
        Self::with_keywords(KeywordSet::bundled())
    }
}

impl KeywordOtpParser {
    /// Creates a parser with every bundled language and the default known services.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with a custom keyword set.
    #[must_use]
    pub fn with_keywords(keywords: KeywordSet) -> Self {
        Self {
            keywords,
            known_services: patterns::KNOWN_SERVICES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Replaces the known services scanned for first when naming the service.
    #[must_use]
    pub fn known_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_services = services
            .into_iter()
            .map(|s| s.into().to_lowercase())
            .collect();
        self
    }

    /// Returns the keyword set.
    #[must_use]
    pub fn keyword_set(&self) -> &KeywordSet {
        &self.keywords
    }

    /// Collects candidates in priority order. A language pattern hit is the only candidate.
    fn candidates(&self, message: &str) -> Vec<String> {
        if let Some(code) = self
            .keywords
            .patterns()
            .iter()
            .find_map(|rule| rule.capture(message))
        {
            return vec![code.to_string()];
        }

        let mut codes: Vec<String> = captures(&DIGITS, message).map(str::to_string).collect();
        codes.extend(captures(&SPACED_DIGITS, message).map(|code| {
            code.chars()
                .filter(|c| !c.is_whitespace() && *c != '-')
                .collect::<String>()
        }));
        codes.extend(captures(&ALPHANUMERIC, message).map(str::to_string));
        if let Some(code) = candidates::bracket_code(message) {
            codes.push(code);
        }
        codes
    }

    fn infer_service(&self, lower: &str) -> Option<String> {
        if let Some(service) = self
            .known_services
            .iter()
            .find(|service| lower.contains(service.as_str()))
        {
            return Some(service.clone());
        }

        LEADING_SERVICE
            .iter()
            .chain(PHRASE_SERVICE.iter())
            .filter_map(|regex| regex.captures(lower)?.get(1))
            .map(|m| m.as_str().trim())
            .find(|name| self.is_valid_service_name(name))
            .map(str::to_string)
    }

    fn is_valid_service_name(&self, name: &str) -> bool {
        name.chars().count() > 2 && !self.keywords.is_keyword(name) && !COMMON_WORDS.contains(&name)
    }
}

impl OtpParser for KeywordOtpParser {
    #[instrument(
        name = "KeywordOtpParser::parse",
        skip_all,
        fields(message_len = message.len())
    )]
    fn parse(&self, message: &str) -> Option<ParsedOtp> {
        let lower = message.to_lowercase();
        if !self.keywords.matches(&lower) {
            debug!("No OTP keyword in message");
            return None;
        }

        if let Some(code) = candidates::vendor_code(message) {
            return Some(ParsedOtp::new(Some(VENDOR_CODE_SERVICE), code));
        }

        let Some(code) = self
            .candidates(message)
            .into_iter()
            .find(|code| !should_ignore(code, message))
        else {
            debug!("No code found");
            return None;
        };

        let service = self.infer_service(&lower);
        debug!(service = ?service, "Found code");
        Some(ParsedOtp { service, code })
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn captures<'a>(regex: &'a Regex, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns `true` if `code` sits inside a phone number, amount, time or date, or ends like
/// one.
fn should_ignore(code: &str, message: &str) -> bool {
    let inside_ignored = IGNORE_PATTERNS.iter().any(|regex| {
        regex
            .find_iter(message)
            .any(|m| m.as_str().contains(code))
    });
    if inside_ignored {
        return true;
    }

    let lower = code.to_lowercase();
    DATE_TIME_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}
