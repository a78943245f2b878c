//! Record parsing: headers, MIME body flattening, and outbound detection.

use mail_parser::{Message, MessageParser, MimeHeaders, PartType};
use tracing::debug;

use crate::clean::html::html_to_text;
use crate::error::{Result, TuneError};
use crate::model::address::EmailAddress;
use crate::model::message::{ParsedMessage, RawRecord};
use crate::parser::header::{self, Headers};

/// Maximum multipart nesting depth followed (adversarial input guard).
const MAX_DEPTH: usize = 16;

/// Turns [`RawRecord`]s into [`ParsedMessage`]s for one mailbox owner.
///
/// The owner address is fixed at construction; there is no global state, so
/// several parsers for different owners can coexist.
#[derive(Debug, Clone)]
pub struct RecordParser {
    owner: String,
}

impl RecordParser {
    /// Create a parser that marks messages from `owner_address` as outbound.
    ///
    /// The owner may be given with a display name (`"Me <me@x.com>"`); only the
    /// address token is kept.
    pub fn new(owner_address: &str) -> Result<Self> {
        let owner = EmailAddress::parse(owner_address).address;
        if !owner.contains('@') {
            return Err(TuneError::Config(format!(
                "owner address '{}' is not an email address",
                owner_address.trim()
            )));
        }
        Ok(Self { owner })
    }

    /// The bare owner address used for the outbound/inbound split.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Parse one record.
    ///
    /// Fails only when the record has no usable `From` address. A missing
    /// `Message-ID` is legal. Bodies that cannot be decoded are recovered as
    /// lossy text rather than rejected.
    pub fn parse(&self, record: &RawRecord) -> Result<ParsedMessage> {
        let data = skip_from_line(&record.data);
        let header_end = header::find_header_end(data).unwrap_or(data.len());
        let headers = Headers::parse(&data[..header_end]);

        if headers.is_empty() {
            return Err(TuneError::parse(record.offset, "no header block"));
        }

        let from = headers
            .first("from")
            .map(EmailAddress::parse)
            .filter(|addr| !addr.address.is_empty())
            .ok_or_else(|| TuneError::parse(record.offset, "missing From header"))?;

        let message_id = headers.message_id("message-id");
        let in_reply_to = headers.message_id("in-reply-to");

        let (subject, raw_body_text) = match MessageParser::default().parse(data) {
            Some(msg) => (
                msg.subject()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
                flatten_body(&msg),
            ),
            None => {
                debug!(offset = record.offset, "MIME parse failed, using raw body");
                (
                    headers.first("subject").unwrap_or_default().to_string(),
                    extract_body_fallback(data),
                )
            }
        };

        let is_outbound = from.is(&self.owner);

        Ok(ParsedMessage {
            message_id,
            in_reply_to,
            from,
            subject,
            raw_body_text,
            is_outbound,
            offset: record.offset,
        })
    }
}

/// Flatten the MIME tree into plain text.
///
/// All `text/plain` parts are joined in document order. Without any, the
/// first `text/html` part is converted to text.
fn flatten_body(msg: &Message<'_>) -> String {
    let mut plain: Vec<String> = Vec::new();
    let mut html: Option<String> = None;
    collect_text_parts(msg, 0, 0, &mut plain, &mut html);

    if !plain.is_empty() {
        plain.join("\n")
    } else {
        html.map(|h| html_to_text(&h)).unwrap_or_default()
    }
}

/// Depth-first walk from part `id`, skipping attachments and attached messages.
fn collect_text_parts(
    msg: &Message<'_>,
    id: usize,
    depth: usize,
    plain: &mut Vec<String>,
    html: &mut Option<String>,
) {
    if depth > MAX_DEPTH {
        debug!(depth, "Multipart nesting too deep, ignoring subtree");
        return;
    }
    let Some(part) = msg.parts.get(id) else {
        return;
    };

    let is_attachment = part
        .content_disposition()
        .map(|d| d.ctype().eq_ignore_ascii_case("attachment"))
        .unwrap_or(false);
    if is_attachment {
        return;
    }

    let subtype = part
        .content_type()
        .and_then(|ct| ct.subtype())
        .map(str::to_ascii_lowercase);

    match &part.body {
        PartType::Multipart(children) => {
            for &child in children.iter() {
                collect_text_parts(msg, child as usize, depth + 1, plain, html);
            }
        }
        PartType::Text(text) => {
            if matches!(subtype.as_deref(), None | Some("plain")) {
                plain.push(text.to_string());
            }
        }
        PartType::Html(text) => {
            if html.is_none() {
                *html = Some(text.to_string());
            }
        }
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
            // Text parts mail-parser could not decode (unknown charset and the like).
            let is_text_plain = part
                .content_type()
                .map(|ct| ct.ctype().eq_ignore_ascii_case("text"))
                .unwrap_or(false)
                && subtype.as_deref() == Some("plain");
            if is_text_plain {
                let charset = part
                    .content_type()
                    .and_then(|ct| ct.attribute("charset"))
                    .unwrap_or("utf-8");
                plain.push(header::decode_charset(charset, bytes));
            }
        }
        // Attached messages are forwarded content, not the sender's own text.
        _ => {}
    }
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Body extraction when `mail-parser` cannot parse the message.
fn extract_body_fallback(data: &[u8]) -> String {
    match header::find_header_end(data) {
        Some(pos) => {
            let body = &data[pos..];
            let body = body
                .iter()
                .position(|&b| b != b'\r' && b != b'\n')
                .map(|start| &body[start..])
                .unwrap_or(&[]);
            String::from_utf8_lossy(body).into_owned()
        }
        None => String::new(),
    }
}
