//! Mailbox sources.
//!
//! A source yields the whole batch of messages up front; the pipeline then
//! processes them one at a time. Failing to open or read a source is fatal
//! for the run. A single message that cannot be parsed is logged and skipped.

pub mod eml;
pub mod imap;
pub mod mbox;

use std::path::Path;

use crate::config::SourceConfig;
use crate::error::{Result, SiteError};
use crate::model::message::Message;

pub use self::imap::ImapSource;
pub use eml::EmlDirSource;
pub use mbox::MboxSource;

/// Something that can list the messages of one mailbox folder.
pub trait MailSource {
    /// Human-readable description for log lines.
    fn describe(&self) -> String;

    /// All messages, in mailbox order.
    fn messages(&mut self) -> Result<Vec<Message>>;

    /// Messages whose subject contains `subject`, compared case-insensitively.
    fn search_subject(&mut self, subject: &str) -> Result<Vec<Message>> {
        let needle = subject.to_lowercase();
        Ok(self
            .messages()?
            .into_iter()
            .filter(|m| m.subject.to_lowercase().contains(&needle))
            .collect())
    }
}

/// Fetch the batch to process: everything, or only subject matches.
pub fn fetch(source: &mut dyn MailSource, search_subject: Option<&str>) -> Result<Vec<Message>> {
    let messages = match search_subject {
        Some(subject) if !subject.is_empty() => {
            tracing::debug!(subject, "Searching for messages by subject");
            source.search_subject(subject)?
        }
        _ => source.messages()?,
    };
    tracing::info!(
        source = %source.describe(),
        count = messages.len(),
        "Fetched messages"
    );
    Ok(messages)
}

/// Open the source `[source]` names: a remote folder when `url` is set,
/// otherwise the local `path`.
pub fn open_configured(config: &SourceConfig) -> Result<Box<dyn MailSource>> {
    if config.url.is_some() {
        return Ok(Box::new(ImapSource::from_config(config)?));
    }
    let path = config
        .path
        .as_deref()
        .ok_or_else(|| SiteError::Config("source.path or source.url is required".into()))?;
    open_source(path)
}

/// Open a source for `path`: a directory of `.eml` files or an MBOX file.
pub fn open_source(path: &Path) -> Result<Box<dyn MailSource>> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SiteError::SourceNotFound(path.to_path_buf())
        } else {
            SiteError::io(path, e)
        }
    })?;
    if metadata.is_dir() {
        Ok(Box::new(EmlDirSource::new(path)))
    } else {
        Ok(Box::new(MboxSource::new(path)))
    }
}
