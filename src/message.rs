//! Incoming messages and the "already processed" bookkeeping around them.
//!
//! Message sources produce [`RawMessage`] values; a [`MessageTracker`] hands each new,
//! plausible message to a parser exactly once.
//!
//! ```
//! use otp_extract::{MessageTracker, PatternOtpParser, RawMessage};
//!
//! let parser = PatternOtpParser::new();
//! let mut tracker = MessageTracker::new();
//!
//! let batch = vec![
//!     RawMessage::new("1", "Your Lyft code is 744444").with_sender("+15550100"),
//!     RawMessage::new("2", "On my way").with_outgoing(true),
//! ];
//! let found = tracker.extract_otps(&parser, batch.clone());
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].1.code, "744444");
//!
//! // The same batch again yields nothing new
//! assert!(tracker.extract_otps(&parser, batch).is_empty());
//! ```

use crate::error::{Error, Result};
use crate::parser::{OtpParser, ParsedOtp};
use crate::patterns::{CURRENCY_SYMBOLS, MIN_MESSAGE_CHARS};
use chrono::{DateTime, Utc};
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use std::collections::HashSet;
use tracing::{debug, warn};

/// A message as delivered by a message source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    id: String,
    text: String,
    sender: String,
    group_label: Option<String>,
    is_outgoing: bool,
    received_at: DateTime<Utc>,
}

impl RawMessage {
    /// Creates an incoming message received now, with no sender.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender: String::new(),
            group_label: None,
            is_outgoing: false,
            received_at: Utc::now(),
        }
    }

    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the conversation group label.
    #[must_use]
    pub fn with_group_label(mut self, label: impl Into<String>) -> Self {
        self.group_label = Some(label.into());
        self
    }

    /// Marks the message as sent by the local user.
    #[must_use]
    pub fn with_outgoing(mut self, is_outgoing: bool) -> Self {
        self.is_outgoing = is_outgoing;
        self
    }

    /// Sets the receive time.
    #[must_use]
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }

    /// Builds a message from a raw RFC 822 e-mail.
    ///
    /// The text is the first `text/plain` part, else the first `text/html` part, else the
    /// body of the first sub-part. The sender is the `From` header and the receive time the
    /// `Date` header, falling back to now when it is missing or unparseable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseMessage`] if the e-mail or its body cannot be decoded.
    pub fn from_rfc822(id: impl Into<String>, raw: &[u8]) -> Result<Self> {
        let parsed = parse_mail(raw).map_err(|source| Error::ParseMessage { source })?;
        let text = extract_body_text(&parsed).map_err(|source| Error::ParseMessage { source })?;

        let sender = parsed.headers.get_first_value("From").unwrap_or_default();

        let received_at = parsed
            .headers
            .get_first_value("Date")
            .and_then(|value| mailparse::dateparse(&value).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        Ok(Self {
            id: id.into(),
            text,
            sender,
            group_label: None,
            is_outgoing: false,
            received_at,
        })
    }

    /// Returns the source's identifier for this message.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the sender.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Returns the conversation group label, if any.
    #[must_use]
    pub fn group_label(&self) -> Option<&str> {
        self.group_label.as_deref()
    }

    /// Returns `true` if the local user sent this message.
    #[must_use]
    pub fn is_outgoing(&self) -> bool {
        self.is_outgoing
    }

    /// Returns when the message was received.
    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Returns `true` if this message should be handed to a parser: incoming and
    /// [plausible](is_plausible_otp_text).
    #[must_use]
    pub fn is_candidate(&self) -> bool {
        !self.is_outgoing && is_plausible_otp_text(&self.text)
    }
}

/// Returns `false` for text that cannot be an OTP message: empty, shorter than five
/// characters, or mentioning a currency.
#[must_use]
pub fn is_plausible_otp_text(text: &str) -> bool {
    !text.is_empty()
        && text.chars().count() >= MIN_MESSAGE_CHARS
        && !text.contains(CURRENCY_SYMBOLS)
}

/// Remembers which messages were already handed to a parser.
///
/// The set only grows until [`reset`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct MessageTracker {
    processed: HashSet<String>,
}

impl MessageTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidates in `batch` not seen before, in order, and marks them processed.
    pub fn take_new<I>(&mut self, batch: I) -> Vec<RawMessage>
    where
        I: IntoIterator<Item = RawMessage>,
    {
        batch
            .into_iter()
            .filter(RawMessage::is_candidate)
            .filter(|message| self.processed.insert(message.id.clone()))
            .collect()
    }

    /// Runs `parser` over the new candidates in `batch` and returns those holding a code.
    pub fn extract_otps<P, I>(&mut self, parser: &P, batch: I) -> Vec<(RawMessage, ParsedOtp)>
    where
        P: OtpParser + ?Sized,
        I: IntoIterator<Item = RawMessage>,
    {
        let fresh = self.take_new(batch);
        debug!(parser = parser.name(), new_messages = fresh.len(), "Parsing new messages");

        fresh
            .into_iter()
            .filter_map(|message| {
                let parsed = parser.parse(message.text())?;
                Some((message, parsed))
            })
            .collect()
    }

    /// Returns `true` if the message with `id` was already processed.
    #[must_use]
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed.contains(id)
    }

    /// Forgets every processed identifier.
    pub fn reset(&mut self) {
        self.processed.clear();
    }

    /// Returns the number of processed identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processed.len()
    }

    /// Returns `true` if nothing was processed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

/// Extracts text content from a parsed email, handling multipart messages.
fn extract_body_text(
    parsed: &ParsedMail<'_>,
) -> std::result::Result<String, mailparse::MailParseError> {
    if !parsed.subparts.is_empty() {
        for mimetype in ["text/plain", "text/html"] {
            let part = parsed
                .subparts
                .iter()
                .find(|part| part.ctype.mimetype.eq_ignore_ascii_case(mimetype));
            if let Some(part) = part {
                match part.get_body() {
                    Ok(body) => return Ok(body),
                    Err(e) => warn!(mimetype, error = %e, "Failed to decode message part"),
                }
            }
        }

        // If no text parts found, try to get body from first subpart
        if let Some(first_part) = parsed.subparts.first() {
            return extract_body_text(first_part);
        }
    }

    parsed.get_body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PatternOtpParser;
    use chrono::TimeZone;

    #[test]
    fn test_plausibility_filter() {
        assert!(!is_plausible_otp_text(""));
        assert!(!is_plausible_otp_text("1234"));
        assert!(is_plausible_otp_text("12345"));
        assert!(!is_plausible_otp_text("Your total is $12.99, code 4821"));
        assert!(!is_plausible_otp_text("Betrag 12 € bezahlt"));
        assert!(!is_plausible_otp_text("Paid ₹500 via UPI"));
        assert!(!is_plausible_otp_text("合计 ¥300"));
        // Characters, not bytes
        assert!(!is_plausible_otp_text("验证码"));
    }

    #[test]
    fn test_candidate_excludes_outgoing() {
        let message = RawMessage::new("1", "Your code is 123456");
        assert!(message.is_candidate());
        assert!(!message.with_outgoing(true).is_candidate());
    }

    #[test]
    fn test_take_new_marks_processed() {
        let mut tracker = MessageTracker::new();
        let batch = vec![
            RawMessage::new("a", "Your code is 111111"),
            RawMessage::new("b", "hi"),
            RawMessage::new("a", "Your code is 111111"),
        ];

        let fresh = tracker.take_new(batch);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id(), "a");
        assert!(tracker.is_processed("a"));
        assert!(!tracker.is_processed("b"));

        assert!(tracker.take_new(vec![RawMessage::new("a", "Your code is 111111")]).is_empty());
    }

    #[test]
    fn test_reset() {
        let mut tracker = MessageTracker::new();
        tracker.take_new(vec![RawMessage::new("a", "Your code is 111111")]);
        assert_eq!(tracker.len(), 1);

        tracker.reset();
        assert!(tracker.is_empty());
        assert_eq!(
            tracker
                .take_new(vec![RawMessage::new("a", "Your code is 111111")])
                .len(),
            1
        );
    }

    #[test]
    fn test_extract_otps_in_order() {
        let parser = PatternOtpParser::new();
        let mut tracker = MessageTracker::new();
        let batch = vec![
            RawMessage::new("1", "Your Lyft code is 744444"),
            RawMessage::new("2", "See you tomorrow"),
            RawMessage::new("3", "Telegram code 65847"),
        ];

        let found = tracker.extract_otps(&parser, batch);
        let codes: Vec<_> = found.iter().map(|(m, p)| (m.id(), p.code.as_str())).collect();
        assert_eq!(codes, vec![("1", "744444"), ("3", "65847")]);
        // Messages without a code are still processed
        assert!(tracker.is_processed("2"));
    }

    #[test]
    fn test_from_rfc822_simple() {
        let raw = b"From: Acme <no-reply@acme.test>\r\n\
                    Date: Tue, 1 Jul 2025 10:00:00 +0000\r\n\
                    Subject: Sign in\r\n\r\n\
                    Your verification code is 654321.";
        let message = RawMessage::from_rfc822("uid-7", raw).unwrap();

        assert_eq!(message.id(), "uid-7");
        assert!(message.text().contains("654321"));
        assert_eq!(message.sender(), "Acme <no-reply@acme.test>");
        assert_eq!(
            message.received_at(),
            Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_from_rfc822_prefers_plain_text() {
        let raw = b"From: a@example.com\r\n\
                    Content-Type: multipart/alternative; boundary=\"XX\"\r\n\r\n\
                    --XX\r\n\
                    Content-Type: text/html\r\n\r\n\
                    <p>Code <b>111111</b></p>\r\n\
                    --XX\r\n\
                    Content-Type: text/plain\r\n\r\n\
                    Code 222222\r\n\
                    --XX--\r\n";
        let message = RawMessage::from_rfc822("1", raw).unwrap();
        assert!(message.text().contains("222222"));
    }

    #[test]
    fn test_from_rfc822_missing_date_uses_now() {
        let before = Utc::now();
        let message =
            RawMessage::from_rfc822("1", b"From: a@example.com\r\n\r\nCode 123456").unwrap();
        assert!(message.received_at() >= before);
    }
}
