//! Deterministic output paths.
//!
//! ```text
//! {output}/{messages_sub_dir}/{file_name_format}          message pages
//! {output}/{images_sub_dir}/{stem}/{file}                 original attachments
//! {output}/{images_sub_dir}/{stem}/{rendition}-{file}     image renditions
//! {output}/{index template}                               index pages
//! ```
//!
//! `stem` is the sent-date formatted with `file_date_format`, plus a `-N`
//! suffix when several messages share the same second.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::OutputConfig;
use crate::model::result::MessageResult;

/// Placeholder for the date stem in `file_name_format`.
pub const DATE_PLACEHOLDER: &str = "{date}";
/// Placeholder for the subject slug in `file_name_format`.
pub const SLUG_PLACEHOLDER: &str = "{slug}";

/// Longest subject slug, in bytes.
pub const MAX_SLUG_BYTES: usize = 80;
/// Longest attachment file name, in bytes. Leaves room for a rendition prefix
/// under the usual 255-byte file name limit.
pub const MAX_FILE_NAME_BYTES: usize = 150;

/// Resolves every path the pipeline writes.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    messages_sub_dir: String,
    images_sub_dir: String,
    file_name_format: String,
    file_date_format: String,
}

impl OutputLayout {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            root: config.dir.clone(),
            messages_sub_dir: trim_slashes(&config.messages_sub_dir),
            images_sub_dir: trim_slashes(&config.images_sub_dir),
            file_name_format: config.file_name_format.clone(),
            file_date_format: config.file_date_format.clone(),
        }
    }

    /// Base stem for a sent-date, before collision suffixes.
    pub fn date_stem(&self, sent_date: &DateTime<Utc>) -> String {
        sent_date.format(&self.file_date_format).to_string()
    }

    pub fn attachment_folder(&self, stem: &str) -> PathBuf {
        join_sub(&self.root, &self.images_sub_dir).join(stem)
    }

    /// Link to an attachment file, relative to the output root.
    pub fn attachment_href(&self, stem: &str, file_name: &str) -> String {
        href(&[&self.images_sub_dir, stem, file_name])
    }

    /// Attachment folder relative to the output root.
    pub fn attachment_folder_href(&self, stem: &str) -> String {
        href(&[&self.images_sub_dir, stem])
    }

    pub fn page_name(&self, result: &MessageResult) -> String {
        self.file_name_format
            .replace(DATE_PLACEHOLDER, &result.stem)
            .replace(SLUG_PLACEHOLDER, &slugify(&result.subject))
    }

    pub fn page_path(&self, result: &MessageResult) -> PathBuf {
        join_sub(&self.root, &self.messages_sub_dir).join(self.page_name(result))
    }

    /// Link to a message page, relative to the output root.
    pub fn page_href(&self, result: &MessageResult) -> String {
        href(&[&self.messages_sub_dir, &self.page_name(result)])
    }

    /// Prefix that leads from a message page back to the output root
    /// (`""`, `"../"`, `"../../"`, ...).
    pub fn page_root_prefix(&self) -> String {
        let depth = self
            .messages_sub_dir
            .split('/')
            .filter(|s| !s.is_empty())
            .count();
        "../".repeat(depth)
    }

    pub fn index_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }
}

/// Lower-case the subject and join its alphanumeric runs with single dashes.
///
/// `"Re: Hello, World!"` → `"re-hello-world"`. Empty results become `"untitled"`.
/// The slug is cut to [`MAX_SLUG_BYTES`].
pub fn slugify(subject: &str) -> String {
    let mut slug = String::with_capacity(subject.len());
    let mut pending_dash = false;
    for ch in subject.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    let slug = truncate_bytes(&slug, MAX_SLUG_BYTES).trim_end_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Keep only the last path component and drop characters that are unsafe in
/// file names. Returns `None` when nothing usable remains.
pub fn safe_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.' | '_' | ' ' | '(' | ')' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cap_file_name(cleaned.trim().trim_start_matches('.'));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Cut a name to [`MAX_FILE_NAME_BYTES`], keeping a short extension.
fn cap_file_name(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_BYTES {
        return name.to_string();
    }
    let ext = match name.rfind('.') {
        Some(dot) if name.len() - dot <= 16 => &name[dot..],
        _ => "",
    };
    let stem = &name[..name.len() - ext.len()];
    let stem = truncate_bytes(stem, MAX_FILE_NAME_BYTES - ext.len()).trim_end();
    format!("{stem}{ext}")
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn trim_slashes(s: &str) -> String {
    s.trim_matches('/').to_string()
}

fn join_sub(root: &Path, sub: &str) -> PathBuf {
    if sub.is_empty() {
        root.to_path_buf()
    } else {
        root.join(sub)
    }
}

fn href(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
