//! Directory of individual `.eml` files (RFC 5322 messages without MBOX framing).

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{Result, SiteError};
use crate::model::message::Message;
use crate::parser::mime;

use super::MailSource;

/// Reads every `*.eml` file of a directory, ordered by file name.
pub struct EmlDirSource {
    dir: PathBuf,
}

impl EmlDirSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn eml_files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SiteError::SourceNotFound(self.dir.clone())
            } else {
                SiteError::io(&self.dir, e)
            }
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SiteError::io(&self.dir, e))?.path();
            let is_eml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"));
            if is_eml && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl MailSource for EmlDirSource {
    fn describe(&self) -> String {
        format!("eml directory {}", self.dir.display())
    }

    fn messages(&mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for path in self.eml_files()? {
            let data = std::fs::read(&path).map_err(|e| SiteError::io(&path, e))?;
            match mime::parse_message(&data) {
                Some(message) => messages.push(message),
                None => warn!(path = %path.display(), "Skipping unparseable message"),
            }
        }
        Ok(messages)
    }
}
