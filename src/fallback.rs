//! Hand-written parsers for message templates the generic strategies miss.
//!
//! Each [`FallbackParser`] pairs an exact predicate with an extraction step. They run only
//! after every generic strategy has failed, in [`FallbackParser::ALL`] order.
//!
//! ```
//! use otp_extract::fallback::FallbackParser;
//!
//! let parser = FallbackParser::CaterAllen;
//! let parsed = parser.parse(parser.example()).unwrap();
//! assert_eq!(parsed.code, "699486");
//! ```

use crate::parser::ParsedOtp;

/// A fixed message template with its own extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FallbackParser {
    /// Kotak Bank transaction OTP, where the code is the first of several numbers.
    KotakBank,
    /// `Your security code: 12.34.56` style messages.
    SecurityCodeColon,
    /// `Your portal verification code is : jh7112` style messages.
    PortalVerification,
    /// Cater Allen payment OTP, where the code is the last word.
    CaterAllen,
}

impl FallbackParser {
    /// All fallback parsers, in the order they are tried.
    pub const ALL: [FallbackParser; 4] = [
        FallbackParser::KotakBank,
        FallbackParser::SecurityCodeColon,
        FallbackParser::PortalVerification,
        FallbackParser::CaterAllen,
    ];

    /// Describes the template.
    #[must_use]
    pub fn notes(self) -> &'static str {
        match self {
            FallbackParser::KotakBank => "Kotak Bank, includes a bunch of numbers",
            FallbackParser::SecurityCodeColon => "Generic security code with dotted digits",
            FallbackParser::PortalVerification => "Portal verification",
            FallbackParser::CaterAllen => "Cater Allen payment OTP",
        }
    }

    /// Returns a message this parser handles.
    #[must_use]
    pub fn example(self) -> &'static str {
        match self {
            FallbackParser::KotakBank => {
                "123456 is the OTP for transaction of INR 1234.00 on your Kotak Bank Card 1234 \
                 at AMAZON PAY INDIA PRIVATET valid for 15 mins. DONT SHARE OTP WITH ANYONE \
                 INCLUDING BANK OFFICIALS."
            }
            FallbackParser::SecurityCodeColon => "Your security code: 73.28.25",
            FallbackParser::PortalVerification => {
                "Your portal verification code is : jh7112 Msg&Data rates may apply. \
                 Reply STOP to opt-out"
            }
            FallbackParser::CaterAllen => {
                "OTP to MAKE A NEW PAYMENT of GBP 9.94 to 560027 & 27613445. Call us if this \
                 wasn't you. NEVER share this code, not even with Cater Allen staff 699486"
            }
        }
    }

    /// Inferred service this parser requires, if any.
    #[must_use]
    pub fn required_service(self) -> Option<&'static str> {
        match self {
            FallbackParser::KotakBank => Some("transaction"),
            FallbackParser::SecurityCodeColon
            | FallbackParser::PortalVerification
            | FallbackParser::CaterAllen => None,
        }
    }

    /// Returns `true` if `message` (original case) fits this template.
    #[must_use]
    pub fn can_parse(self, message: &str) -> bool {
        let words: Vec<&str> = message.split(' ').collect();
        match self {
            FallbackParser::KotakBank => {
                message.contains("Kotak Bank") && words.len() > 5 && is_int(words[0])
            }
            FallbackParser::SecurityCodeColon => {
                message.contains("Your security code:")
                    && words.get(3).is_some_and(|word| is_int(&word.replace('.', "")))
            }
            FallbackParser::PortalVerification => {
                message.contains("portal verification")
                    && words.get(6).is_some_and(|word| word.chars().count() == 6)
            }
            FallbackParser::CaterAllen => {
                words.last().is_some_and(|word| is_int(word))
                    && message.contains("Cater Allen staff")
                    && message.contains("OTP to MAKE A NEW PAYMENT")
            }
        }
    }

    /// Extracts the code from a message that fits this template.
    #[must_use]
    pub fn parse(self, message: &str) -> Option<ParsedOtp> {
        if !self.can_parse(message) {
            return None;
        }

        let mut words = message.split(' ');
        let parsed = match self {
            FallbackParser::KotakBank => ParsedOtp::new(Some("kotak bank"), words.next()?),
            FallbackParser::SecurityCodeColon => {
                ParsedOtp::new(None, words.nth(3)?.replace('.', ""))
            }
            FallbackParser::PortalVerification => ParsedOtp::new(None, words.nth(6)?),
            FallbackParser::CaterAllen => ParsedOtp::new(Some("cater allen"), words.last()?),
        };
        Some(parsed)
    }

    /// Parses `message` if the inferred `service` satisfies this parser's requirement.
    #[must_use]
    pub fn try_parse(self, message: &str, service: Option<&str>) -> Option<ParsedOtp> {
        match self.required_service() {
            Some(required) if service != Some(required) => None,
            _ => self.parse(message),
        }
    }
}

fn is_int(word: &str) -> bool {
    word.parse::<i64>().is_ok()
}
