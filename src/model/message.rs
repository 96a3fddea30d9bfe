//! Source messages and their MIME part trees.
//!
//! These are owned, read-only snapshots produced by a [`crate::source::MailSource`].
//! The walker never mutates them.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};

use super::address::EmailAddress;

/// A message as yielded by a mailbox source.
#[derive(Debug, Clone)]
pub struct Message {
    /// Parsed `Date:` header. `None` when absent or unparseable; the walker
    /// rejects such messages.
    pub sent_date: Option<DateTime<Utc>>,
    /// First `From:` address.
    pub sender: EmailAddress,
    /// Decoded subject line.
    pub subject: String,
    /// Root of the part tree.
    pub root: Part,
}

/// A MIME `type/subtype` pair, both lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub primary: String,
    pub sub: String,
}

impl ContentType {
    pub fn new(primary: &str, sub: &str) -> Self {
        Self {
            primary: primary.trim().to_ascii_lowercase(),
            sub: sub.trim().to_ascii_lowercase(),
        }
    }

    /// Parse a header-style value such as `"Text/HTML; charset=utf-8"`.
    ///
    /// Parameters are ignored. A value without `/` yields an empty subtype.
    pub fn parse(value: &str) -> Self {
        let essence = value.split(';').next().unwrap_or("");
        match essence.split_once('/') {
            Some((primary, sub)) => Self::new(primary, sub),
            None => Self::new(essence, ""),
        }
    }

    pub fn is_html(&self) -> bool {
        self.primary == "text" && self.sub == "html"
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.sub)
    }
}

/// Payload of a part.
#[derive(Debug, Clone)]
pub enum PartBody {
    /// Decoded text content.
    Text(String),
    /// Decoded binary content.
    Binary(Vec<u8>),
    /// Child parts of a multipart container, in order.
    Multipart(Vec<Part>),
}

/// One node of a message's MIME tree.
#[derive(Debug, Clone)]
pub struct Part {
    pub content_type: ContentType,
    /// Filename from `Content-Disposition` or `Content-Type; name=`.
    pub filename: Option<String>,
    pub body: PartBody,
}

impl Part {
    pub fn text(content_type: &str, text: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::parse(content_type),
            filename: None,
            body: PartBody::Text(text.into()),
        }
    }

    pub fn binary(content_type: &str, filename: Option<&str>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: ContentType::parse(content_type),
            filename: filename.map(String::from),
            body: PartBody::Binary(data.into()),
        }
    }

    pub fn multipart(content_type: &str, children: Vec<Part>) -> Self {
        Self {
            content_type: ContentType::parse(content_type),
            filename: None,
            body: PartBody::Multipart(children),
        }
    }

    /// Text view of the payload. Binary payloads are decoded lossily;
    /// multipart containers have no text.
    pub fn text_content(&self) -> Option<Cow<'_, str>> {
        match &self.body {
            PartBody::Text(text) => Some(Cow::Borrowed(text)),
            PartBody::Binary(bytes) => Some(String::from_utf8_lossy(bytes)),
            PartBody::Multipart(_) => None,
        }
    }

    /// Raw bytes of the payload; `None` for multipart containers.
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.body {
            PartBody::Text(text) => Some(text.as_bytes()),
            PartBody::Binary(bytes) => Some(bytes),
            PartBody::Multipart(_) => None,
        }
    }

    pub fn children(&self) -> Option<&[Part]> {
        match &self.body {
            PartBody::Multipart(children) => Some(children),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_parse_strips_parameters() {
        let ct = ContentType::parse("Text/HTML; charset=\"utf-8\"");
        assert_eq!(ct.primary, "text");
        assert_eq!(ct.sub, "html");
        assert!(ct.is_html());
        assert_eq!(ct.to_string(), "text/html");
    }

    #[test]
    fn test_content_type_without_subtype() {
        let ct = ContentType::parse("weird");
        assert_eq!(ct.primary, "weird");
        assert_eq!(ct.sub, "");
    }

    #[test]
    fn test_part_accessors() {
        let part = Part::binary("image/png", Some("a.png"), vec![1, 2, 3]);
        assert_eq!(part.payload(), Some(&[1u8, 2, 3][..]));
        assert!(part.children().is_none());

        let tree = Part::multipart("multipart/mixed", vec![part]);
        assert_eq!(tree.children().map(|c| c.len()), Some(1));
        assert!(tree.payload().is_none());
        assert!(tree.text_content().is_none());
    }
}
