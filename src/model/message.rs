//! Mail records as they move through the pipeline: raw, parsed, cleaned.

use super::address::EmailAddress;

/// One mailbox entry, already split out of its container.
///
/// Holds the complete RFC 5322 message (headers + MIME body). Lives only
/// until it has been parsed.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Byte offset of the record inside its MBOX file (0 for standalone input).
    pub offset: u64,
    /// Raw message bytes, optionally still carrying the `From ` separator line.
    pub data: Vec<u8>,
}

impl RawRecord {
    pub fn new(offset: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            data: data.into(),
        }
    }
}

/// A normalized message.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ParsedMessage {
    /// The `Message-ID` header value including angle brackets, if present.
    ///
    /// Case-sensitive. Gmail reuses the same id for every stored copy of a sent message.
    pub message_id: Option<String>,

    /// First message id from `In-Reply-To`, if present.
    pub in_reply_to: Option<String>,

    /// Sender (first `From:` header).
    pub from: EmailAddress,

    /// Decoded subject line (empty if absent).
    pub subject: String,

    /// Flattened plain-text body before any cleaning.
    pub raw_body_text: String,

    /// Sent by the account owner.
    pub is_outbound: bool,

    /// Offset of the originating record, for diagnostics.
    pub offset: u64,
}

/// A parsed message together with its sanitized body.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CleanedMessage {
    pub message: ParsedMessage,
    /// Body with quotes, signatures, markup and header echoes removed.
    pub clean_body_text: String,
}

impl CleanedMessage {
    pub fn message_id(&self) -> Option<&str> {
        self.message.message_id.as_deref()
    }

    pub fn in_reply_to(&self) -> Option<&str> {
        self.message.in_reply_to.as_deref()
    }

    pub fn subject(&self) -> &str {
        &self.message.subject
    }

    pub fn is_outbound(&self) -> bool {
        self.message.is_outbound
    }
}
