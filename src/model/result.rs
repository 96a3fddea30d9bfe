//! Per-message walk results consumed by the page writer.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the page and index templates need to know about one message.
///
/// Built by [`crate::walker::MimeWalker`]; treated as immutable once the walk
/// returns.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResult {
    pub subject: String,
    /// Personal name of the sender, or the local part of the address.
    pub sender: String,
    pub sent_date: DateTime<Utc>,
    /// Date-derived name shared by the page and the attachment folder.
    pub stem: String,
    /// Raw text of the part that provided the body.
    pub full_text: Option<String>,
    /// Trimmed (and, for HTML, sanitized) body.
    pub body: Option<String>,
    pub body_is_html: bool,
    pub attachments: Vec<AttachmentRef>,
    /// Position in the order the source yielded messages.
    pub sequence: usize,
}

impl MessageResult {
    pub fn new(
        subject: impl Into<String>,
        sender: impl Into<String>,
        sent_date: DateTime<Utc>,
        stem: impl Into<String>,
        sequence: usize,
    ) -> Self {
        Self {
            subject: subject.into(),
            sender: sender.into(),
            sent_date,
            stem: stem.into(),
            full_text: None,
            body: None,
            body_is_html: false,
            attachments: Vec::new(),
            sequence,
        }
    }
}

/// An attachment kept on disk for a message.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentRef {
    pub file_name: String,
    pub content_type: String,
    /// Absolute location on disk.
    #[serde(skip)]
    pub path: PathBuf,
    /// `/`-separated path relative to the output directory.
    pub href: String,
    pub size: u64,
    pub is_image: bool,
    pub renditions: Vec<RenditionRef>,
}

/// A rendition file of an image attachment.
#[derive(Debug, Clone, Serialize)]
pub struct RenditionRef {
    pub name: String,
    pub href: String,
}
