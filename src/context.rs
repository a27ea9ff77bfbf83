//! Context checks that separate real codes from numbers that only look like them.

use crate::patterns::{self, DATE_TIME_SUFFIXES, DISQUALIFYING_PREFIXES, PHONE_GUARD};
use tracing::trace;

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    Empty,
    NotFound,
    DateOrTimeSuffix,
    DisqualifyingPrefix,
    DashedNumberTail,
    BadTerminator,
}

/// Returns `true` if the message contains a dotted phone number and must be ignored.
pub(crate) fn contains_phone_number(text: &str) -> bool {
    PHONE_GUARD.is_match(text)
}

/// Returns `true` if `code` reads as a code where it first occurs in `message`.
///
/// `message` is the lower-cased message text.
pub(crate) fn is_valid_in_context(message: &str, code: &str) -> bool {
    match check(message, code) {
        Ok(()) => true,
        Err(reason) => {
            trace!(?reason, "Rejected candidate");
            false
        }
    }
}

fn check(message: &str, code: &str) -> Result<(), Rejection> {
    if code.is_empty() {
        return Err(Rejection::Empty);
    }

    let lower = code.to_lowercase();
    if DATE_TIME_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return Err(Rejection::DateOrTimeSuffix);
    }

    let start = message.find(code).ok_or(Rejection::NotFound)?;
    let end = start + code.len();

    let mut before = message[..start].chars().rev();
    match before.next() {
        Some(prev) if DISQUALIFYING_PREFIXES.contains(&prev) => {
            return Err(Rejection::DisqualifyingPrefix)
        }
        // A leading dash is a marker, unless it joins the code to a longer number
        Some('-') if before.next().is_some_and(|c| c.is_ascii_digit()) => {
            return Err(Rejection::DashedNumberTail)
        }
        _ => {}
    }

    match message[end..].chars().next() {
        Some(next) if !patterns::is_ending_char(next) => Err(Rejection::BadTerminator),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OtpParser, PatternOtpParser};

    #[test]
    fn test_accepts_plain_code() {
        assert!(is_valid_in_context("your code is 123456.", "123456"));
        assert!(is_valid_in_context("123456 is your code", "123456"));
        assert!(is_valid_in_context("code: 123456", "123456"));
    }

    #[test]
    fn test_rejects_disqualifying_prefix() {
        assert_eq!(check("pay $1234 now", "1234"), Err(Rejection::DisqualifyingPrefix));
        assert_eq!(check("see 12/3456 ok", "3456"), Err(Rejection::DisqualifyingPrefix));
        assert_eq!(check(r"dir\5678 ok", "5678"), Err(Rejection::DisqualifyingPrefix));
    }

    #[test]
    fn test_leading_dash() {
        assert!(is_valid_in_context("code -482913 expires soon", "482913"));
        assert!(is_valid_in_context("g-830829 is your code", "830829"));
        assert_eq!(
            check("call 388-941-4444 now", "4444"),
            Err(Rejection::DashedNumberTail)
        );
    }

    #[test]
    fn test_digit_dash_prefix_rejected() {
        // Any dash directly after a digit joins the candidate to the number before it,
        // even when that number is too short to be a phone number
        assert_eq!(check("ab 12-34567 ok", "34567"), Err(Rejection::DashedNumberTail));
        assert_eq!(PatternOtpParser::new().parse("ab 12-34567 ok"), None);
        assert!(is_valid_in_context("ab -34567 ok", "34567"));
        assert!(is_valid_in_context("ab x-34567 ok", "34567"));
    }

    #[test]
    fn test_rejects_bad_terminator() {
        assert_eq!(check("ref 1234: done", "1234"), Err(Rejection::BadTerminator));
        assert_eq!(check("ref 1234a done", "1234"), Err(Rejection::BadTerminator));
        assert!(is_valid_in_context("验证码 1234，请勿泄露", "1234"));
    }

    #[test]
    fn test_rejects_time_and_ordinal_suffixes() {
        for code in ["1030am", "1230pm", "21st", "23rd", "4th", "22nd", "10AM"] {
            assert_eq!(
                check(&format!("see you {code} ok"), code),
                Err(Rejection::DateOrTimeSuffix),
                "{code}"
            );
        }
    }

    #[test]
    fn test_uses_first_occurrence() {
        // The first "1234" is inside a longer number, so the candidate is rejected even though
        // a later occurrence stands alone.
        assert!(!is_valid_in_context("a12345 and 1234", "1234"));
    }

    #[test]
    fn test_missing_or_empty() {
        assert_eq!(check("nothing here", ""), Err(Rejection::Empty));
        assert_eq!(check("nothing here", "9999"), Err(Rejection::NotFound));
    }

    #[test]
    fn test_phone_guard() {
        assert!(contains_phone_number("call 800.555.1234 for help, code 4821"));
        assert!(contains_phone_number("800.555.1234"));
        assert!(!contains_phone_number("800-555-1234"));
    }
}
