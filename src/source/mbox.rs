//! MBOX file source.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::model::message::Message;
use crate::parser::mbox::MboxParser;
use crate::parser::mime;

use super::MailSource;

/// Reads every message of a single MBOX file.
pub struct MboxSource {
    path: PathBuf,
}

impl MboxSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MailSource for MboxSource {
    fn describe(&self) -> String {
        format!("mbox {}", self.path.display())
    }

    fn messages(&mut self) -> Result<Vec<Message>> {
        let parser = MboxParser::new(&self.path)?;
        let mut messages = Vec::new();
        let mut index = 0usize;
        parser.for_each_message(&mut |raw| {
            match mime::parse_message(raw) {
                Some(message) => messages.push(message),
                None => warn!(index, "Skipping unparseable message"),
            }
            index += 1;
        })?;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MBOX: &[u8] = b"From a@x Tue Jan  2 10:00:00 2024
From: Alice <alice@example.com>
Subject: Weekly ride
Date: Tue, 02 Jan 2024 10:00:00 +0000

See you Saturday.

From b@x Wed Jan  3 10:00:00 2024
From: Bob <bob@example.com>
Subject: Re: weekly RIDE
Date: Wed, 03 Jan 2024 10:00:00 +0000

Count me in.

From c@x Thu Jan  4 10:00:00 2024
From: Carol <carol@example.com>
Subject: Something else
Date: Thu, 04 Jan 2024 10:00:00 +0000

Unrelated.
";

    fn source() -> (tempfile::NamedTempFile, MboxSource) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MBOX).unwrap();
        let source = MboxSource::new(file.path());
        (file, source)
    }

    #[test]
    fn test_lists_all_messages_in_order() {
        let (_file, mut source) = source();
        let messages = source.messages().unwrap();
        let subjects: Vec<&str> = messages.iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(subjects, ["Weekly ride", "Re: weekly RIDE", "Something else"]);
    }

    #[test]
    fn test_search_subject_is_case_insensitive() {
        let (_file, mut source) = source();
        let messages = crate::source::fetch(&mut source, Some("weekly ride")).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender.display_name, "Bob");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut source = MboxSource::new("/no/such/archive.mbox");
        assert!(source.messages().is_err());
    }
}
