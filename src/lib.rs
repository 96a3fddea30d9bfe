//! `mailsite` — turn a mailbox into a browsable static HTML site.
//!
//! Messages from a [`source::MailSource`] are walked part by part
//! ([`walker::MimeWalker`]); text becomes a trimmed, sanitized body,
//! binary parts become attachment files with image renditions
//! ([`output::AttachmentSink`]), and every message gets a page plus an
//! entry in the date-ordered index ([`output::PageWriter`]).

pub mod config;
pub mod content;
pub mod error;
pub mod hook;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod walker;
