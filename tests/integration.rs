//! Integration tests for otp-extract.
//!
//! The live tests fetch the published remote configuration. They are compiled only with the
//! `integration-tests` feature and are ignored by default.
//! To run them:
//!
//! ```bash
//! # Optional: point at another configuration document
//! export OTP_EXTRACT_CONFIG_URL="https://example.com/config.json"
//!
//! # Run with the integration-tests feature
//! cargo test --features integration-tests -- --ignored
//! ```

use otp_extract::{
    KeywordOtpParser, MessageTracker, OtpParser, ParsedOtp, PatternOtpParser, RawMessage,
};

#[cfg(feature = "integration-tests")]
mod live {
    use otp_extract::{
        ConfigHandle, ConfigOrigin, ConfigRefresher, OtpParser, ParsedOtp, PatternOtpParser,
        RefreshConfig, DEFAULT_CONFIG_URL,
    };
    use std::env;
    use std::time::Duration;

    // ─────────────────────────────────────────────────────────────────────────────
    // Test Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    fn get_test_url() -> String {
        dotenvy::dotenv().ok();
        env::var("OTP_EXTRACT_CONFIG_URL").unwrap_or_else(|_| DEFAULT_CONFIG_URL.to_string())
    }

    fn get_test_settings(dir: &tempfile::TempDir) -> RefreshConfig {
        RefreshConfig::builder()
            .remote_url(get_test_url())
            .cache_path(dir.path().join("config.json"))
            .request_timeout(Duration::from_secs(20))
            .build()
            .expect("Valid refresh settings")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Live Configuration Tests
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_fetch_published_config() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = ConfigRefresher::new(get_test_settings(&dir), ConfigHandle::default());

        refresher.refresh().await.expect("Failed to refresh");

        let snapshot = refresher.handle().load();
        assert!(!snapshot.service_rules().is_empty());
        assert!(!snapshot.known_services().is_empty());
        assert!(dir.path().join("config.json").exists());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_published_config_parses_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = ConfigRefresher::new(get_test_settings(&dir), ConfigHandle::default());
        refresher.refresh().await.expect("Failed to refresh");

        let parser = PatternOtpParser::with_handle(refresher.handle().clone());
        assert_eq!(
            parser.parse("Your Lyft code is 744444"),
            Some(ParsedOtp::new(Some("lyft"), "744444"))
        );
        assert_eq!(
            parser.parse("Telegram code 65847").map(|otp| otp.code).as_deref(),
            Some("65847")
        );
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_restart_uses_cache() {
        let dir = tempfile::tempdir().unwrap();

        let refresher = ConfigRefresher::new(get_test_settings(&dir), ConfigHandle::default());
        refresher.refresh().await.expect("Failed to refresh");

        let restarted = ConfigRefresher::new(get_test_settings(&dir), ConfigHandle::default());
        assert_eq!(restarted.load_initial().await, ConfigOrigin::Cache);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message Pipeline Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_email_pipeline() {
    let raw = b"From: Proton <no-reply@proton.test>\r\n\
                Date: Wed, 2 Jul 2025 08:30:00 +0000\r\n\
                Subject: Verify\r\n\r\n\
                Your Proton verification code is: 861880";
    let message = RawMessage::from_rfc822("uid-1", raw).unwrap();

    let parser = PatternOtpParser::new();
    let mut tracker = MessageTracker::new();

    let found = tracker.extract_otps(&parser, vec![message.clone()]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].1, ParsedOtp::new(Some("proton"), "861880"));

    // Seen once, never again
    assert!(tracker.extract_otps(&parser, vec![message]).is_empty());
}

#[test]
fn test_chat_pipeline_skips_noise() {
    let batch = vec![
        RawMessage::new("1", "Your card was charged $12.00").with_sender("+15550100"),
        RawMessage::new("2", "ok").with_sender("+15550101"),
        RawMessage::new("3", "My code is 123456").with_outgoing(true),
        RawMessage::new("4", "Snapchat code: 481489. Do not share it or use it elsewhere!")
            .with_sender("+15550102")
            .with_group_label("Snapchat"),
    ];

    let parsers: Vec<Box<dyn OtpParser>> = vec![
        Box::new(PatternOtpParser::new()),
        Box::new(KeywordOtpParser::new()),
    ];
    for parser in &parsers {
        let mut tracker = MessageTracker::new();
        let found = tracker.extract_otps(parser.as_ref(), batch.clone());

        assert_eq!(found.len(), 1, "{}", parser.name());
        assert_eq!(found[0].0.id(), "4");
        assert_eq!(found[0].0.group_label(), Some("Snapchat"));
        assert_eq!(found[0].1.code, "481489");
    }
}
