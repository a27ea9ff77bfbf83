//! Example: Proper error handling with retries.
//!
//! Refreshes the remote configuration, retrying transient failures with exponential
//! backoff. Parsing keeps working on the previous configuration throughout.
//!
//! # Usage
//!
//! ```bash
//! # Optional: try a URL that fails
//! export OTP_EXTRACT_CONFIG_URL="http://127.0.0.1:9/config.json"
//! cargo run --example error_handling
//! ```

use otp_extract::{
    ConfigHandle, ConfigRefresher, Error, OtpParser, ParserConfig, PatternOtpParser,
    RefreshConfig, DEFAULT_CONFIG_URL,
};
use std::env;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Refresh with automatic retry for transient failures
async fn refresh_with_retry(refresher: &ConfigRefresher) -> Result<(), Error> {
    let mut backoff = INITIAL_BACKOFF;

    for attempt in 1..=MAX_RETRIES {
        println!("Refresh attempt {attempt}/{MAX_RETRIES}...");

        match refresher.refresh().await {
            Ok(()) => {
                println!("Configuration refreshed!");
                return Ok(());
            }
            Err(e) => {
                println!("  Error: {e}");
                println!("  Category: {}", e.category());
                println!("  Retryable: {}", e.is_retryable());

                if !e.is_retryable() || attempt == MAX_RETRIES {
                    return Err(e);
                }

                println!("  Retrying in {backoff:?}...");
                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Configuration errors are permanent
    match RefreshConfig::builder().remote_url("ftp://example.com").build() {
        Ok(_) => println!("Unexpectedly accepted an ftp URL"),
        Err(e) => println!("Invalid settings: {e} (retryable: {})", e.is_retryable()),
    }

    match ParserConfig::from_json(br#"{ "servicePatterns": "nope" }"#) {
        Ok(_) => println!("Unexpectedly decoded a bad document"),
        Err(e) => println!("Invalid document: {e} [{}]", e.category()),
    }

    let url = env::var("OTP_EXTRACT_CONFIG_URL").unwrap_or_else(|_| DEFAULT_CONFIG_URL.into());
    let settings = match RefreshConfig::builder()
        .remote_url(url)
        .request_timeout(Duration::from_secs(5))
        .build()
    {
        Ok(settings) => settings,
        Err(e) => {
            println!("Invalid settings: {e}");
            return;
        }
    };

    let handle = ConfigHandle::default();
    let refresher = ConfigRefresher::new(settings, handle.clone());
    let parser = PatternOtpParser::with_handle(handle);

    if let Err(e) = refresh_with_retry(&refresher).await {
        println!("Giving up, keeping the bundled configuration: {e}");
    }

    println!("{:?}", parser.parse("Your Lyft code is 744444"));
}
