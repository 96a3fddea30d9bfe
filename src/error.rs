//! Centralized error types for mailsite.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsite library.
#[derive(Error, Debug)]
pub enum SiteError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The mailbox source does not exist.
    #[error("Mail source not found: {0}")]
    SourceNotFound(PathBuf),

    /// The IMAP server refused or broke off the conversation.
    #[error("IMAP error: {0}")]
    Imap(#[from] imap::error::Error),

    /// The TLS connector could not be set up.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// The configuration file is missing required values or is malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A configured template file does not exist.
    #[error("Template '{name}' not found in {dir}")]
    TemplateNotFound { name: String, dir: PathBuf },

    /// The template engine rejected a template or failed to render it.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// A render context could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decoding, resizing or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A MIME structure could not be interpreted.
    #[error("MIME error: {0}")]
    Mime(String),

    /// The message carries no usable `Date:` header.
    #[error("Message has no sent date")]
    MissingDate,

    /// The part tree nests deeper than the walker allows.
    #[error("MIME tree deeper than {0} levels")]
    TooDeep(usize),

    /// A rendition could not be produced.
    #[error("Rendition '{name}' failed: {reason}")]
    Rendition { name: String, reason: String },
}

/// Convenience alias for `Result<T, SiteError>`.
pub type Result<T> = std::result::Result<T, SiteError>;

impl SiteError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `SiteError::io`).
impl From<std::io::Error> for SiteError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
