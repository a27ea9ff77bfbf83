//! Example: Parsing messages with the bundled configuration.
//!
//! Reads messages from the command line, or uses a few samples when none are given.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic_parse
//! cargo run --example basic_parse -- "Your Lyft code is 744444"
//! ```

use otp_extract::{OtpParser, PatternOtpParser};
use std::env;

const SAMPLES: &[&str] = &[
    "123-456 is your Resy account verification code.",
    "[Alibaba Group]Your verification code is 797428",
    "G-A1B2C is your Google verification code.",
    "Your security code: 73.28.25",
    "Running 10 minutes late, see you at 9am",
];

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let messages: Vec<&str> = if args.is_empty() {
        SAMPLES.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    let parser = PatternOtpParser::new();

    for message in messages {
        println!("{message}");
        match parser.parse(message) {
            Some(otp) => println!("  => {otp}"),
            None => println!("  => no code"),
        }
    }
}
