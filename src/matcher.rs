//! Pattern rules for extracting text from messages.
//!
//! This module provides the [`Matcher`] trait and [`PatternRule`], the compiled form of a
//! configured regular expression together with the capture group it extracts.
//!
//! # Example
//!
//! ```
//! use otp_extract::matcher::{Matcher, PatternRule};
//!
//! let rule = PatternRule::new(r"code:\s*(\d+)", 1).unwrap();
//! assert_eq!(rule.find_match("Your code: 42").as_deref(), Some("42"));
//!
//! // A rule must have the group it extracts
//! assert!(PatternRule::new(r"code:\s*\d+", 1).is_err());
//! ```

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

/// Upper bound on the compiled size of a configured pattern.
///
/// Service patterns repeat Unicode word classes up to 64 times, which outgrows the regex
/// crate's default limit.
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Number of compiled patterns kept before the cache is emptied.
const COMPILED_CAPACITY: usize = 512;

/// Compiled patterns keyed by their configured source.
///
/// A refreshed configuration usually repeats most of the patterns already in use, so only
/// the changed ones pay for compilation.
static COMPILED: LazyLock<Mutex<HashMap<String, Regex>>> = LazyLock::new(Mutex::default);

fn compiled() -> MutexGuard<'static, HashMap<String, Regex>> {
    COMPILED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Trait for matching and extracting content from message text.
///
/// Implemented by [`PatternRule`] and by configured custom patterns.
pub trait Matcher: Send + Sync {
    /// Attempts to find and extract matching content from the text.
    ///
    /// Returns `Some(matched_value)` if found, `None` otherwise.
    /// Uses `Cow<str>` to avoid allocations when the match can be borrowed
    /// directly from the input text.
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>>;

    /// Returns a human-readable description of what this matcher looks for.
    ///
    /// Used in logging.
    fn description(&self) -> &str;
}

/// A compiled pattern plus the capture group it extracts.
///
/// Construction fails if the pattern does not compile or lacks the referenced group, so a
/// `PatternRule` that exists is always usable.
#[derive(Debug, Clone)]
pub struct PatternRule {
    regex: Regex,
    group: usize,
    description: String,
}

impl PatternRule {
    /// Compiles `pattern` with the configuration flags (case-insensitive, `.` matches
    /// newlines) and binds it to capture group `group`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern does not compile and
    /// [`Error::MissingCaptureGroup`] if it has fewer than `group` groups.
    pub fn new(pattern: &str, group: usize) -> Result<Self> {
        let regex = compile_pattern(pattern)?;
        Self::from_regex(regex, group)
    }

    /// Wraps an already compiled regex.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCaptureGroup`] if the regex has fewer than `group` groups.
    pub fn from_regex(regex: Regex, group: usize) -> Result<Self> {
        // captures_len() counts the implicit whole-match group 0
        if group >= regex.captures_len() {
            return Err(Error::MissingCaptureGroup {
                pattern: regex.as_str().to_string(),
                group,
            });
        }
        Ok(Self {
            description: format!("pattern: {}", regex.as_str()),
            regex,
            group,
        })
    }

    /// Returns the extracted group of the first match, if the group participated.
    #[must_use]
    pub fn capture<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(self.group))
            .map(|m| m.as_str())
    }

    /// Returns the extracted group of every non-overlapping match, in order.
    pub fn capture_all<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(self.group).map(|m| m.as_str()))
    }

    /// Returns `true` if the pattern matches anywhere in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Returns the capture group index this rule extracts.
    #[must_use]
    pub fn group(&self) -> usize {
        self.group
    }

    /// Returns the compiled pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl Matcher for PatternRule {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        self.capture(text).map(Cow::Borrowed)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Compiles a configured pattern: case-insensitive, `.` matching newlines, ICU-style
/// `\uXXXX` escapes accepted.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] carrying the original source on failure.
///
/// Compiled patterns are cached process-wide, so compiling the same source again is cheap.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    if let Some(regex) = compiled().get(pattern) {
        return Ok(regex.clone());
    }

    // Compiled without holding the lock
    let regex = RegexBuilder::new(&translate_unicode_escapes(pattern))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

    let mut cache = compiled();
    if cache.len() >= COMPILED_CAPACITY {
        cache.clear();
    }
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Rewrites `\uXXXX` escapes to the `\x{XXXX}` form understood by the regex crate.
///
/// Escaped backslashes (`\\u...`) are left alone.
fn translate_unicode_escapes(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains("\\u") {
        return Cow::Borrowed(pattern);
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let hex = chars.get(i + 2..i + 6);
        match hex {
            Some(digits)
                if chars[i + 1] == 'u' && digits.iter().all(char::is_ascii_hexdigit) =>
            {
                out.push_str("\\x{");
                out.extend(digits);
                out.push('}');
                i += 6;
            }
            _ => {
                out.push(chars[i]);
                out.push(chars[i + 1]);
                i += 2;
            }
        }
    }
    Cow::Owned(out)
}
