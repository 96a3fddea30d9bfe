//! Recursive walk over a message's MIME tree.
//!
//! Text parts compete for the body (any HTML part beats plain text,
//! whatever the order), binary parts go to the [`AttachmentSink`] and
//! multipart containers are descended into.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::content::{classify, ContentClass, TextNormalizer};
use crate::error::{Result, SiteError};
use crate::model::message::{Message, Part};
use crate::model::result::MessageResult;
use crate::output::layout::safe_file_name;
use crate::output::AttachmentSink;
use crate::pipeline::RunContext;

/// Nesting depth beyond which a subtree is rejected.
pub const MAX_DEPTH: usize = 32;

pub struct MimeWalker<'a> {
    normalizer: &'a TextNormalizer,
    sink: &'a AttachmentSink,
}

/// Per-message bookkeeping for attachment names.
#[derive(Default)]
struct WalkState {
    used_names: HashSet<String>,
    parts_seen: usize,
}

impl<'a> MimeWalker<'a> {
    pub fn new(normalizer: &'a TextNormalizer, sink: &'a AttachmentSink) -> Self {
        Self { normalizer, sink }
    }

    /// Build the [`MessageResult`] for `message`.
    ///
    /// Fails only when the message has no sent-date. Problems inside the
    /// part tree are logged and the affected part is left out.
    pub fn walk(
        &self,
        run: &mut RunContext,
        message: &Message,
        sequence: usize,
    ) -> Result<MessageResult> {
        let sent_date = message.sent_date.ok_or(SiteError::MissingDate)?;
        let stem = run.claim_stem(&self.sink.layout().date_stem(&sent_date));
        let mut result = MessageResult::new(
            message.subject.as_str(),
            message.sender.sender_name(),
            sent_date,
            stem,
            sequence,
        );

        let mut state = WalkState::default();
        if let Err(e) = self.visit(run, &mut result, &mut state, &message.root, 0) {
            warn!(
                date = %sent_date,
                content_type = %message.root.content_type,
                error = %e,
                "Skipping message part"
            );
        }

        debug!(
            stem = %result.stem,
            attachments = result.attachments.len(),
            html = result.body_is_html,
            "Walked message"
        );
        Ok(result)
    }

    fn visit(
        &self,
        run: &mut RunContext,
        result: &mut MessageResult,
        state: &mut WalkState,
        part: &Part,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(SiteError::TooDeep(MAX_DEPTH));
        }
        state.parts_seen += 1;

        match classify(&part.content_type.primary) {
            ContentClass::Multipart => {
                let children = part.children().ok_or_else(|| {
                    SiteError::Mime(format!("{} part has no children", part.content_type))
                })?;
                for (index, child) in children.iter().enumerate() {
                    if let Err(e) = self.visit(run, result, state, child, depth + 1) {
                        warn!(
                            date = %result.sent_date,
                            index,
                            content_type = %child.content_type,
                            error = %e,
                            "Skipping message part"
                        );
                    }
                }
                Ok(())
            }
            ContentClass::Text => {
                self.select_body(result, part);
                Ok(())
            }
            class if class.is_attachment() => self.store_attachment(run, result, state, part),
            _ => {
                warn!(
                    date = %result.sent_date,
                    content_type = %part.content_type,
                    "Unhandled content type, skipping part"
                );
                Ok(())
            }
        }
    }

    /// Take this part as the body if there is none yet or it is HTML.
    fn select_body(&self, result: &mut MessageResult, part: &Part) {
        let is_html = part.content_type.is_html();
        if result.body.is_some() && !is_html {
            return;
        }
        let Some(text) = part.text_content() else {
            return;
        };
        result.body = Some(self.normalizer.normalize(&text, is_html));
        result.full_text = Some(text.into_owned());
        result.body_is_html = is_html;
    }

    fn store_attachment(
        &self,
        run: &mut RunContext,
        result: &mut MessageResult,
        state: &mut WalkState,
        part: &Part,
    ) -> Result<()> {
        let file_name = state.file_name_for(part);
        if let Some(attachment) = self.sink.add(run, &result.stem, part, &file_name)? {
            result.attachments.push(attachment);
        }
        Ok(())
    }
}

impl WalkState {
    /// Sanitized file name for `part`, unique within the message.
    fn file_name_for(&mut self, part: &Part) -> String {
        let base = part
            .filename
            .as_deref()
            .and_then(safe_file_name)
            .unwrap_or_else(|| {
                let ext = if part.content_type.sub.is_empty() {
                    "bin"
                } else {
                    part.content_type.sub.as_str()
                };
                let ext: String = ext
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                format!("part-{}.{}", self.parts_seen, ext)
            });

        let mut candidate = base.clone();
        let mut k = 2;
        while !self.used_names.insert(candidate.clone()) {
            candidate = with_suffix(&base, k);
            k += 1;
        }
        candidate
    }
}

/// `photo.jpg` + 2 → `photo-2.jpg`; `README` + 2 → `README-2`.
fn with_suffix(name: &str, k: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{k}.{ext}"),
        _ => format!("{name}-{k}"),
    }
}
