//! Example: Adding custom patterns and swapping configuration at runtime.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example custom_patterns
//! ```

use otp_extract::{CustomPatternConfig, OtpParser, ParserConfig, PatternOtpParser};

const MESSAGE: &str = "ACME login token x7y8z9, valid for 5 minutes";

fn main() -> otp_extract::Result<()> {
    let parser = PatternOtpParser::new();
    println!("Bundled:  {:?}", parser.parse(MESSAGE));

    // Matcher selects the message, extractor's first group is the code
    let config = ParserConfig::builder()
        .custom_pattern(CustomPatternConfig::new(
            Some("acme"),
            r"^acme login",
            r"token ([a-z0-9]{6})",
        ))
        .build()?;

    println!("Custom patterns as JSON:\n{}", config.to_json()?);

    // Parsers built from the same handle see the swap
    let shared = parser.clone();
    parser.replace_config(config);
    println!("Custom:   {:?}", shared.parse(MESSAGE));

    // Rules that do not compile are reported by the builder
    let broken = ParserConfig::builder()
        .custom_pattern(CustomPatternConfig::new(None, r"(unclosed", ""))
        .build();
    if let Err(e) = broken {
        println!("Rejected: {e}");
    }

    Ok(())
}
