//! Conversion of raw RFC 5322 bytes into the owned [`Message`] part tree.

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MessagePart, MimeHeaders, PartType};

use crate::model::address::EmailAddress;
use crate::model::message::{ContentType, Message, Part, PartBody};
use crate::parser::header;

/// Maximum depth for recursive conversion (to prevent stack overflow on adversarial input).
/// Deeper subtrees are replaced by an empty container.
const MAX_DEPTH: usize = 64;

/// Parse a raw message. Returns `None` if `mail-parser` cannot make sense of it.
pub fn parse_message(raw: &[u8]) -> Option<Message> {
    let bytes = skip_from_line(raw);
    let parsed = MessageParser::default().parse(bytes)?;

    let sent_date = parsed
        .date()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.to_timestamp(), 0))
        .or_else(|| parsed.header_raw("Date").and_then(header::parse_date));

    let sender = parsed
        .from()
        .and_then(|from| from.first())
        .map(|addr| EmailAddress::new(addr.name().unwrap_or(""), addr.address().unwrap_or("")))
        .filter(|addr| !addr.address.is_empty() || !addr.display_name.is_empty())
        .or_else(|| parsed.header_raw("From").map(EmailAddress::parse))
        .unwrap_or_default();

    let subject = parsed.subject().unwrap_or("").trim().to_string();

    let root = if parsed.parts.is_empty() {
        Part::text("text/plain", "")
    } else {
        convert_part(&parsed, 0, 0)
    };

    Some(Message {
        sent_date,
        sender,
        subject,
        root,
    })
}

/// Build the owned node for `parsed.parts[id]` and its descendants.
fn convert_part(parsed: &mail_parser::Message<'_>, id: usize, depth: usize) -> Part {
    let Some(part) = parsed.parts.get(id) else {
        return Part::binary("application/octet-stream", None, Vec::new());
    };

    let content_type = declared_type(part);
    let filename = part.attachment_name().map(String::from);

    let body = match &part.body {
        PartType::Text(text) | PartType::Html(text) => PartBody::Text(text.to_string()),
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => PartBody::Binary(bytes.to_vec()),
        PartType::Message(_) => PartBody::Binary(part.contents().to_vec()),
        PartType::Multipart(children) if depth < MAX_DEPTH => PartBody::Multipart(
            children
                .iter()
                .map(|&child| convert_part(parsed, child, depth + 1))
                .collect(),
        ),
        PartType::Multipart(_) => {
            tracing::warn!(depth, "Multipart nesting too deep, dropping subtree");
            PartBody::Multipart(Vec::new())
        }
    };

    Part {
        content_type,
        filename,
        body,
    }
}

/// The part's declared content type, or the type implied by how
/// `mail-parser` decoded it.
fn declared_type(part: &MessagePart<'_>) -> ContentType {
    if let Some(ct) = part.content_type() {
        return ContentType::new(ct.ctype(), ct.subtype().unwrap_or(""));
    }
    match &part.body {
        PartType::Text(_) => ContentType::new("text", "plain"),
        PartType::Html(_) => ContentType::new("text", "html"),
        PartType::Message(_) => ContentType::new("message", "rfc822"),
        PartType::Multipart(_) => ContentType::new("multipart", "mixed"),
        PartType::Binary(_) | PartType::InlineBinary(_) => {
            ContentType::new("application", "octet-stream")
        }
    }
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
