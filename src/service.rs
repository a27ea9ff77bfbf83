//! Service name inference.

use crate::config::ParserSnapshot;
use crate::patterns;

/// Infers which service sent `message`.
///
/// `message` is the lower-cased message text. Service rules are tried in order and a capture
/// that is blank or a generic auth word is passed over; then the known services are scanned
/// as substrings.
pub(crate) fn infer_service(snapshot: &ParserSnapshot, message: &str) -> Option<String> {
    let from_rules = snapshot.service_rules().iter().find_map(|rule| {
        let name = rule.capture(message)?.trim();
        (!name.is_empty() && !patterns::is_auth_word(name)).then(|| name.to_string())
    });

    from_rules.or_else(|| {
        snapshot
            .known_services()
            .iter()
            .find(|service| message.contains(service.as_str()))
            .cloned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;

    fn infer(message: &str) -> Option<String> {
        infer_service(&ParserSnapshot::bundled(), &message.to_lowercase())
    }

    #[test]
    fn test_pattern_capture() {
        assert_eq!(
            infer("123-456 is your Resy account verification code.").as_deref(),
            Some("resy")
        );
        assert_eq!(
            infer("Your Lyft code is 744444").as_deref(),
            Some("lyft")
        );
    }

    #[test]
    fn test_multi_word_capture() {
        assert_eq!(
            infer("Use 1234 to verify your Sony Entertainment Network account.").as_deref(),
            Some("sony entertainment network")
        );
    }

    #[test]
    fn test_generic_words_fall_through() {
        // "your security code" captures "security", which is not a service
        assert_eq!(infer("Your security code is 1234").as_deref(), None);
        assert_eq!(
            infer("512665 (NetEase Verification Code)").as_deref(),
            Some("netease")
        );
    }

    #[test]
    fn test_known_service_substring() {
        assert_eq!(infer("paypal: 1234 expires soon").as_deref(), Some("paypal"));
    }

    #[test]
    fn test_known_service_order() {
        let config = ParserConfig {
            service_patterns: vec![],
            known_services: vec!["apple pay".into(), "apple".into()],
            custom_patterns: vec![],
        };
        let snapshot = ParserSnapshot::compile(config);
        assert_eq!(
            infer_service(&snapshot, "apple pay: 1234").as_deref(),
            Some("apple pay")
        );
    }

    #[test]
    fn test_no_service() {
        assert_eq!(infer("1234 expires soon"), None);
    }
}
