//! Example: Using tracing for observability.
//!
//! Every parse emits a span and the refresher logs each load, fetch and swap.
//!
//! # Usage
//!
//! ```bash
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=otp_extract=debug
//!
//! cargo run --example with_tracing
//! ```

use otp_extract::{
    ConfigHandle, ConfigRefresher, KeywordOtpParser, MessageTracker, OtpParser,
    PatternOtpParser, RawMessage, RefreshConfig,
};
use std::env;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> otp_extract::Result<()> {
    // Initialize tracing subscriber with environment filter
    // Use RUST_LOG environment variable to control log levels
    // Example: RUST_LOG=otp_extract=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otp_extract=debug")),
        )
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let cache_path = env::temp_dir().join("otp-extract-demo").join("config.json");
    let settings = RefreshConfig::builder()
        .cache_path(&cache_path)
        .request_timeout(Duration::from_secs(10))
        .build()?;

    let handle = ConfigHandle::default();
    let refresher = ConfigRefresher::new(settings, handle.clone());

    // Emits ConfigRefresher::load_initial
    let origin = refresher.load_initial().await;
    tracing::info!(?origin, "Initial configuration installed");

    // Emits ConfigRefresher::refresh; failures leave the bundled configuration in place
    if let Err(e) = refresher.refresh().await {
        tracing::warn!(error = %e, category = %e.category(), "Refresh failed");
    }

    let parsers: Vec<Box<dyn OtpParser>> = vec![
        Box::new(PatternOtpParser::with_handle(handle)),
        Box::new(KeywordOtpParser::new()),
    ];

    let batch = vec![
        RawMessage::new("1", "Your Lyft code is 744444"),
        RawMessage::new("2", "Paid $4.50 at Blue Bottle"),
        RawMessage::new("3", "WhatsApp code 507-240"),
    ];

    for parser in &parsers {
        let mut tracker = MessageTracker::new();
        for (message, otp) in tracker.extract_otps(parser.as_ref(), batch.clone()) {
            tracing::info!(parser = parser.name(), id = message.id(), otp = %otp, "Found code");
        }
    }

    tracing::info!("Example completed successfully");

    Ok(())
}
