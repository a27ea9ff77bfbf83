//! Example: The keyword-gated parser and language bundles.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example keyword_engine
//! ```

use otp_extract::{KeywordOtpParser, KeywordSet, LanguageBundle, OtpParser};

const MESSAGES: &[&str] = &[
    "Your verification code is 482913.",
    "Ihr Bestätigungscode lautet 551203",
    "Ваш код: 7731",
    "【淘宝网】验证码 907311，请勿泄露",
    "Order 771332 has shipped",
];

fn main() -> otp_extract::Result<()> {
    let parser = KeywordOtpParser::new();
    println!(
        "{} keywords, {} patterns",
        parser.keyword_set().keywords().len(),
        parser.keyword_set().patterns().len()
    );

    for message in MESSAGES {
        println!("{message}\n  => {:?}", parser.parse(message));
    }

    // A bundle for a language that is not shipped
    let bundle = LanguageBundle::from_json(
        br#"{ "keywords": ["kode"], "patterns": ["kode\\s+(\\d{4,8})"] }"#,
    )?;
    let mut keywords = KeywordSet::default();
    keywords.add_bundle(&bundle);

    let indonesian = KeywordOtpParser::with_keywords(keywords).known_services(["gojek"]);
    println!("{:?}", indonesian.parse("Kode 6620 untuk login Gojek"));

    Ok(())
}
