//! Bundled pattern library.
//!
//! These tables make up the default [`ParserConfig`](crate::config::ParserConfig) and the
//! fixed rules the extraction pipeline applies around it. Order matters in
//! [`SERVICE_PATTERNS`] and [`KNOWN_SERVICES`]: the first hit wins, so specific phrasings
//! come before generic ones.

use regex::Regex;
use std::sync::LazyLock;

/// Service name to report for a vendor-prefixed code.
pub const VENDOR_CODE_SERVICE: &str = "google";

/// Characters that disqualify a code when they directly precede it.
pub const DISQUALIFYING_PREFIXES: &[char] = &['/', '\\', '$'];

/// Non-whitespace characters accepted directly after a code.
pub const ENDING_PUNCTUATION: &[char] = &[',', '.', '!', '\u{ff0c}', '\u{3002}'];

/// Two-letter endings marking a time of day or an ordinal date.
pub const DATE_TIME_SUFFIXES: &[&str] = &["am", "pm", "st", "rd", "th", "nd"];

/// Currency symbols that mark a message as a receipt rather than an OTP.
pub const CURRENCY_SYMBOLS: &[char] = &['$', '\u{20ac}', '\u{20b9}', '\u{a5}'];

/// Minimum message length, in characters, worth handing to a parser.
pub const MIN_MESSAGE_CHARS: usize = 5;

/// Default service-name patterns, most specific first.
///
/// Each pattern's first capture group is the service name. They run against the
/// lower-cased message.
pub static SERVICE_PATTERNS: &[&str] = &[
    r"\bfor\s+your\s+([\w\d ]{2,64})\s+account\b",
    r"\bon\s+your\s+([\w\d ]{2,64})\s+account\b",
    r"\bas\s+your\s+([\w\d ]{2,64})\s+account\b",
    r"\bas\s+([\w\d ]{2,64})\s+account\b",
    r"\byour\s+([\w\d ]{2,64})\s+account\b",
    r"\byour\s+([\w\d ]{2,64})\s+verification\s+code\b",

    r"\byour\s+([\w\d ]{2,64})\s+verification\s+number\b",
    r"\byour\s+([\w\d ]{2,64})\s+verification\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+activation\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+activation\s+number\b",
    r"\byour\s+([\w\d ]{2,64})\s+activation\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+otp\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+otp\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+auth\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+auth\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+authentication\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+authentication\s+number\b",
    r"\byour\s+([\w\d ]{2,64})\s+authentication\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+security\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+security\s+number\b",
    r"\byour\s+([\w\d ]{2,64})\s+security\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+confirmation\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+confirmation\s+number\b",
    r"\byour\s+([\w\d ]{2,64})\s+confirmation\s+pin\b",
    r"\byour\s+([\w\d ]{2,64})\s+access\s+code\b",
    r"\byour\s+([\w\d ]{2,64})\s+access\s+number\b",
    r"\byour\s+([\w\d ]{2,64})\s+access\s+pin\b",

    r"\byour\s+verification\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+verification\s+number\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+verification\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+activation\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+activation\s+number\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+activation\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+otp\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+otp\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+auth\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+auth\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+authentication\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+authentication\s+number\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+authentication\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+security\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+security\s+number\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+security\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+confirmation\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+confirmation\s+number\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+confirmation\s+pin\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+access\s+code\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+access\s+number\s+for\s+([\w\d ]{2,64})\b",
    r"\byour\s+access\s+pin\s+for\s+([\w\d ]{2,64})\b",

    r"\byour\s+([\w\d]{2,64})\s+code\b",
    r"\byour\s+([\w\d]{2,64})\s+pin\b",

    r"\b([\w\d]{2,64})\s+login\s+verification\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+verification\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+verification\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+activation\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+activation\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+activation\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+otp\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+otp\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+auth\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+auth\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+auth\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+authentication\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+authentication\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+authentication\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+security\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+security\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+security\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+confirmation\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+confirmation\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+confirmation\s+pin\b",
    r"\b([\w\d]{2,64})\s+login\s+access\s+code\b",
    r"\b([\w\d]{2,64})\s+login\s+access\s+number\b",
    r"\b([\w\d]{2,64})\s+login\s+access\s+pin\b",

    r"\b([\w\d]{2,64})\s+verification\s+code\b",
    r"\b([\w\d]{2,64})\s+verification\s+number\b",
    r"\b([\w\d]{2,64})\s+verification\s+pin\b",
    r"\b([\w\d]{2,64})\s+activation\s+code\b",
    r"\b([\w\d]{2,64})\s+activation\s+number\b",
    r"\b([\w\d]{2,64})\s+activation\s+pin\b",
    r"\b([\w\d]{2,64})\s+otp\s+code\b",
    r"\b([\w\d]{2,64})\s+otp\s+pin\b",
    r"\b([\w\d]{2,64})\s+auth\s+code\b",
    r"\b([\w\d]{2,64})\s+auth\s+number\b",
    r"\b([\w\d]{2,64})\s+auth\s+pin\b",
    r"\b([\w\d]{2,64})\s+authentication\s+code\b",
    r"\b([\w\d]{2,64})\s+authentication\s+number\b",
    r"\b([\w\d]{2,64})\s+authentication\s+pin\b",
    r"\b([\w\d]{2,64})\s+security\s+code\b",
    r"\b([\w\d]{2,64})\s+security\s+number\b",
    r"\b([\w\d]{2,64})\s+security\s+pin\b",
    r"\b([\w\d]{2,64})\s+confirmation\s+code\b",
    r"\b([\w\d]{2,64})\s+confirmation\s+number\b",
    r"\b([\w\d]{2,64})\s+confirmation\s+pin\b",
    r"\b([\w\d]{2,64})\s+access\s+code\b",
    r"\b([\w\d]{2,64})\s+access\s+number\b",
    r"\b([\w\d]{2,64})\s+access\s+pin\b",

    r"^welcome\s+to\s+([\w\d ]{2,64})[,;.]",
    r"^welcome\s+to\s+([\w\d]{2,64})\b",

    r"^\[([^\]\d]{2,64})\]",
    r"^\(([^)\d]{2,64})\)",

    r"\bcode\s+for\s+([\w\d]{3,64})\b",
    r"\bpin\s+for\s+([\w\d]{3,64})\b",
    r"\botp\s+for\s+([\w\d]{3,64})\b",
    r"\bnumber\s+for\s+([\w\d]{3,64})\b",

    r"\b([\w\d]{3,64})\s+login\s+code\b",
    r"\b([\w\d]{3,64})\s+login\s+number\b",
    r"\b([\w\d]{3,64})\s+login\s+pin\b",

    r"\b([\w\d]{3,64})\s+code\b",
    r"\b([\w\d]{3,64})\s+number\b",
    r"\b([\w\d]{3,64})\s+pin\b",

    r"【([\x{4e00}-\x{9fa5}\d\w]+)",
];

/// Default known service names, scanned as substrings of the lower-cased message.
pub static KNOWN_SERVICES: &[&str] = &[
    "td ameritrade",
    "coinbase",
    "ally",
    "schwab",
    "id.me",
    "bofa",
    "dropboxing",
    "wise.com",
    "paypal",
    "venmo",
    "cash",
    "segment",
    "verizon",
    "kotak bank",
    "weibo",
    "wechat",
    "whatsapp",
    "viber",
    "snapchat",
    "line",
    "slack",
    "signal",
    "telegram",
    "allo",
    "kakaotalk",
    "voxer",
    "im+",
    "skype",
    "facebook",
    "microsoft",
    "google",
    "twitter",
    "instagram",
    "sony",
    "apple",
    "ubereats",
    "uber",
    "lyft",
    "postmates",
    "doordash",
    "delivery.com",
    "eat24",
    "foodler",
    "amazon",
    "tencent",
    "alibaba",
    "taobao",
    "baidu",
    "youku",
    "toutaio",
    "netease",
    "yandex",
    "uc browser",
    "qq browser",
    "qmenu",
    "sogou",
    "bbm",
    "ebay",
    "intel",
    "cisco",
    "citizen",
    "oracle",
    "xerox",
    "ibm",
    "foursquare",
    "hotmail",
    "outlook",
    "yahoo",
    "netflix",
    "spotify",
    "producthunt",
    "nike",
    "adidas",
    "shopify",
    "wordpress",
    "yelp eats",
    "yelp",
    "drizly",
    "eaze",
    "gopuff",
    "grubhub",
    "seamless",
    "foodpanda",
    "freshdirect",
    "github",
    "flickr",
    "etsy",
    "bank of america",
    "lenscrafters",
    "zocdoc",
    "flycleaners",
    "cleanly",
    "handy",
    "twilio",
    "kik",
    "xbox",
    "imo",
    "kayak",
    "grab",
    "qq",
    "moonpay",
    "robinhood",
    "ao retail",
    "cater allen",
    "apple pay",
    "bill.com",
    "amex",
    "sia",
    "fanduel",
    "cart",
];

/// Generic words a service pattern may capture that are never a service name.
pub static AUTH_WORDS: &[&str] = &[
    "your",
    "auth",
    "login",
    "activation",
    "authentication",
    "verification",
    "confirmation",
    "access code",
    "code",
    "pin",
    "otp",
    "purchase",
    "receipt",
    "phone",
    "number",
    "security",
    "2-step",
    "2-fac",
    "2-factor",
];

// ─────────────────────────────────────────────────────────────────────────────
// Fixed extraction rules
// ─────────────────────────────────────────────────────────────────────────────

/// Vendor code such as `G-A1B2C`. Case-sensitive, applied to the original text.
pub(crate) static VENDOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(G-[A-Z0-9]{5})\b").expect("vendor code regex"));

// Code shapes match ASCII digits only: `\d` would also accept full-width and other
// script digits, which codes are never typed with.

/// North-American phone number written with dots, optionally after "call".
pub(crate) static PHONE_GUARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:call\s+)?([0-9]{3}\.[0-9]{3}\.[0-9]{4})").expect("phone guard regex")
});

/// 4-8 digits.
pub(crate) static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{4,8})\b").expect("digit run regex"));

/// Three digits, a dash or space, then three or four digits.
pub(crate) static SPLIT_DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([0-9]{3}[- ][0-9]{3,4})\b").expect("split digits regex")
});

/// 4-8 lower-case letters and digits. Callers require at least one digit.
pub(crate) static ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z0-9]{4,8})\b").expect("alphanumeric regex"));

/// Token between full-width lenticular brackets.
pub(crate) static BRACKETED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"【([\x{4e00}-\x{9fa5}\d\w]+)】").expect("bracket regex")
});

/// Returns `true` if `c` may directly follow a code.
#[must_use]
pub fn is_ending_char(c: char) -> bool {
    c.is_whitespace() || ENDING_PUNCTUATION.contains(&c)
}

/// Returns `true` if `name` (already trimmed) is a generic word rather than a service.
#[must_use]
pub fn is_auth_word(name: &str) -> bool {
    AUTH_WORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::compile_pattern;

    #[test]
    fn test_bundled_service_patterns_compile() {
        for pattern in SERVICE_PATTERNS {
            let regex = compile_pattern(pattern).unwrap();
            assert!(regex.captures_len() > 1, "{pattern} has no capture group");
        }
    }

    #[test]
    fn test_known_services_are_lowercase() {
        for service in KNOWN_SERVICES {
            assert_eq!(*service, service.to_lowercase());
        }
    }

    #[test]
    fn test_specific_patterns_precede_generic() {
        let position = |needle: &str| SERVICE_PATTERNS.iter().position(|p| *p == needle).unwrap();
        assert!(
            position(r"\byour\s+([\w\d ]{2,64})\s+verification\s+code\b")
                < position(r"\b([\w\d]{3,64})\s+code\b")
        );
    }

    #[test]
    fn test_ending_chars() {
        assert!(is_ending_char(' '));
        assert!(is_ending_char('\n'));
        assert!(is_ending_char('\u{3002}'));
        assert!(!is_ending_char(':'));
        assert!(!is_ending_char('a'));
    }

    #[test]
    fn test_vendor_code_is_case_sensitive() {
        assert!(VENDOR_CODE.is_match("G-A1B2C is your code"));
        assert!(!VENDOR_CODE.is_match("g-a1b2c is your code"));
        assert!(!VENDOR_CODE.is_match("G-A1B2C3 is your code"));
    }

    #[test]
    fn test_bracketed_token() {
        let caps = BRACKETED.captures("【abc123】").unwrap();
        assert_eq!(&caps[1], "abc123");
    }
}
