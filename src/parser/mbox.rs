//! Streaming MBOX splitter.
//!
//! Reads the file line by line through a large buffer and hands every
//! complete message to a callback. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, SiteError};

/// Size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default maximum message size in bytes (256 MB).
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Splits an MBOX file into raw RFC 5322 messages.
///
/// Handles:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - UTF-8 BOM at the start of the file
/// - `>From ` quoting in bodies (one level of `>` is removed)
pub struct MboxParser {
    path: PathBuf,
    max_message_size: usize,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Verifies that the file exists, but does NOT validate that it is
    /// actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SiteError::SourceNotFound(path.clone())
            } else {
                SiteError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            max_message_size: MAX_MESSAGE_SIZE,
        })
    }

    /// Override the per-message size cap. Longer messages are truncated.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Call `on_message` with the raw bytes of every message, without the
    /// leading `From ` separator line. Returns the number of messages seen.
    pub fn for_each_message(&self, on_message: &mut dyn FnMut(&[u8])) -> Result<u64> {
        let file = File::open(&self.path).map_err(|e| SiteError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut message: Option<Vec<u8>> = None;
        let mut truncated = false;
        let mut prev_blank = true;
        let mut line: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| SiteError::io(&self.path, e))?;
            if read == 0 {
                break;
            }

            if is_mbox_separator(&line, offset == 0) {
                if !prev_blank {
                    warn!(offset, "Found 'From ' separator without preceding blank line");
                }
                if let Some(done) = message.take() {
                    on_message(&done);
                    count += 1;
                }
                message = Some(Vec::with_capacity(64 * 1024));
                truncated = false;
            } else if let Some(buf) = message.as_mut() {
                let content = unquote_from(&line);
                if truncated {
                    // Drop the rest of an oversized message.
                } else if buf.len() + content.len() <= self.max_message_size {
                    buf.extend_from_slice(content);
                } else {
                    warn!(
                        offset,
                        max_size = self.max_message_size,
                        "Message exceeds maximum size, truncating body"
                    );
                    truncated = true;
                }
            } else if !is_blank_line(&line) {
                warn!(offset, "Skipping data before the first 'From ' separator");
            }

            prev_blank = is_blank_line(&line);
            offset += read as u64;
        }

        if let Some(done) = message.take() {
            on_message(&done);
            count += 1;
        }

        Ok(count)
    }
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8], at_file_start: bool) -> bool {
    let line = if at_file_start {
        line.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(line)
    } else {
        line
    };
    line.starts_with(b"From ")
}

/// Remove one level of `>` from `>From `, `>>From `, ... lines.
fn unquote_from(line: &[u8]) -> &[u8] {
    let quotes = line.iter().take_while(|&&b| b == b'>').count();
    if quotes > 0 && line[quotes..].starts_with(b"From ") {
        &line[1..]
    } else {
        line
    }
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
