//! Candidate code extraction strategies.

use crate::context;
use crate::patterns::{ALPHANUMERIC, BRACKETED, DIGIT_RUN, SPLIT_DIGITS, VENDOR_CODE};
use regex::Regex;

/// Minimum digits a bracketed token must keep to count as a code.
const MIN_BRACKET_DIGITS: usize = 4;

/// The generic code shapes, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodeFamily {
    /// `123456`
    DigitRun,
    /// `123-456`, `123 4567`
    SplitDigits,
    /// `a1b2c3`
    Alphanumeric,
}

impl CodeFamily {
    pub(crate) const ALL: [CodeFamily; 3] = [
        CodeFamily::DigitRun,
        CodeFamily::SplitDigits,
        CodeFamily::Alphanumeric,
    ];

    fn regex(self) -> &'static Regex {
        match self {
            CodeFamily::DigitRun => &*DIGIT_RUN,
            CodeFamily::SplitDigits => &*SPLIT_DIGITS,
            CodeFamily::Alphanumeric => &*ALPHANUMERIC,
        }
    }

    fn accepts(self, candidate: &str) -> bool {
        match self {
            CodeFamily::Alphanumeric => candidate.chars().any(|c| c.is_ascii_digit()),
            CodeFamily::DigitRun | CodeFamily::SplitDigits => true,
        }
    }

    fn normalize(self, candidate: &str) -> String {
        match self {
            CodeFamily::SplitDigits => candidate.replace(['-', ' '], ""),
            CodeFamily::DigitRun | CodeFamily::Alphanumeric => candidate.to_string(),
        }
    }

    /// Returns the first match of this family that passes the context checks.
    fn find(self, message: &str) -> Option<String> {
        self.regex()
            .captures_iter(message)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|candidate| self.accepts(candidate))
            .filter(|candidate| context::is_valid_in_context(message, candidate))
            .map(|candidate| self.normalize(candidate))
            .find(|code| !code.is_empty())
    }
}

/// Returns a vendor-prefixed code (`G-XXXXX`), prefix included. `text` is the original,
/// case-preserved message.
pub(crate) fn vendor_code(text: &str) -> Option<&str> {
    VENDOR_CODE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Tries each [`CodeFamily`] in order over the lower-cased message.
pub(crate) fn standard_code(message: &str) -> Option<String> {
    CodeFamily::ALL
        .iter()
        .find_map(|family| family.find(message))
}

/// Returns the digits of the first full-width bracketed token holding at least four.
pub(crate) fn bracket_code(message: &str) -> Option<String> {
    BRACKETED
        .captures_iter(message)
        .filter_map(|caps| caps.get(1))
        .map(|inner| {
            inner
                .as_str()
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
        })
        .find(|digits| digits.len() >= MIN_BRACKET_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_code_keeps_prefix() {
        assert_eq!(vendor_code("G-A1B2C is your code."), Some("G-A1B2C"));
        assert_eq!(vendor_code("g-a1b2c is your code."), None);
    }

    #[test]
    fn test_digit_run() {
        assert_eq!(standard_code("your code is 482913.").as_deref(), Some("482913"));
    }

    #[test]
    fn test_scans_past_rejected_matches() {
        assert_eq!(
            standard_code("you paid $2500. your code is 7731").as_deref(),
            Some("7731")
        );
    }

    #[test]
    fn test_split_digits_normalized() {
        assert_eq!(standard_code("whatsapp code 105-876").as_deref(), Some("105876"));
        assert_eq!(standard_code("code 123 456 ok").as_deref(), Some("123456"));
    }

    #[test]
    fn test_alphanumeric_requires_digit() {
        assert_eq!(standard_code("your code is a1b2c3").as_deref(), Some("a1b2c3"));
        assert_eq!(standard_code("hello world again"), None);
    }

    #[test]
    fn test_family_order() {
        // A digit run wins over an earlier alphanumeric token
        assert_eq!(standard_code("ref x9y8 code 5521").as_deref(), Some("5521"));
    }

    #[test]
    fn test_time_suffix_rejected() {
        assert_eq!(standard_code("see you at 9am"), None);
        assert_eq!(standard_code("meet at 1030am tomorrow"), None);
    }

    #[test]
    fn test_non_ascii_digits_are_not_codes() {
        assert_eq!(standard_code("your code is １２３ ４５６ thanks"), None);
        assert_eq!(standard_code("رمز التحقق ١٢٣-٤٥٦ شكرا"), None);
        assert_eq!(standard_code("code １２３４５６"), None);
        assert_eq!(
            standard_code("code １２３ ４５６, backup 778899").as_deref(),
            Some("778899")
        );
    }

    #[test]
    fn test_bracket_code() {
        assert_eq!(bracket_code("【验证码8848】请查收").as_deref(), Some("8848"));
        assert_eq!(bracket_code("【淘宝网】验证码"), None);
        assert_eq!(bracket_code("【12】 then 【5566】").as_deref(), Some("5566"));
    }
}
