//! Persisting attachments and their image renditions.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::content::{classify, ContentClass};
use crate::error::{Result, SiteError};
use crate::model::message::Part;
use crate::model::rendition::Rendition;
use crate::model::result::{AttachmentRef, RenditionRef};
use crate::output::layout::OutputLayout;
use crate::output::rendition::Resizer;
use crate::output::write_atomic;
use crate::pipeline::RunContext;

/// Writes attachment payloads below `{images_sub_dir}/{stem}/`.
///
/// An attachment is written when its file is missing, or when it is an
/// image and one of its renditions is missing. With deduplication on, only
/// the first copy of a given payload within a run is kept.
pub struct AttachmentSink {
    layout: OutputLayout,
    renditions: Vec<Rendition>,
    dedup: bool,
    resizer: Box<dyn Resizer>,
}

impl AttachmentSink {
    pub fn new(
        layout: OutputLayout,
        renditions: Vec<Rendition>,
        dedup: bool,
        resizer: Box<dyn Resizer>,
    ) -> Self {
        Self {
            layout,
            renditions,
            dedup,
            resizer,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Store `part` as `file_name` in the folder of message `stem`.
    ///
    /// Returns `None` when the payload duplicates one already kept in this run.
    pub fn add(
        &self,
        run: &mut RunContext,
        stem: &str,
        part: &Part,
        file_name: &str,
    ) -> Result<Option<AttachmentRef>> {
        let payload = part
            .payload()
            .ok_or_else(|| SiteError::Mime(format!("attachment '{file_name}' has no payload")))?;
        let folder = self.layout.attachment_folder(stem);
        let path = folder.join(file_name);

        let sum = self.dedup.then(|| checksum(payload));
        if sum.is_some_and(|sum| run.seen(&sum)) {
            if path.exists() {
                std::fs::remove_file(&path).map_err(|e| SiteError::io(&path, e))?;
            }
            info!(file = file_name, stem, "Skipping duplicate attachment");
            return Ok(None);
        }

        let is_image = classify(&part.content_type.primary) == ContentClass::Image;
        let missing: Vec<&Rendition> = if is_image {
            self.renditions
                .iter()
                .filter(|r| !folder.join(r.file_name(file_name)).exists())
                .collect()
        } else {
            Vec::new()
        };

        if !path.exists() || !missing.is_empty() {
            write_atomic(&path, payload)?;
            debug!(path = %path.display(), bytes = payload.len(), "Wrote attachment");
            for rendition in missing {
                if let Err(e) = self.write_rendition(&path, &folder, file_name, rendition) {
                    warn!(
                        file = file_name,
                        rendition = %rendition.name,
                        error = %e,
                        "Failed to create rendition"
                    );
                }
            }
        }

        // Only a payload that made it to disk may shadow later copies.
        if let Some(sum) = sum {
            run.register(sum);
        }

        let renditions = if is_image {
            self.renditions
                .iter()
                .filter(|r| folder.join(r.file_name(file_name)).exists())
                .map(|r| RenditionRef {
                    name: r.name.clone(),
                    href: self.layout.attachment_href(stem, &r.file_name(file_name)),
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(Some(AttachmentRef {
            file_name: file_name.to_string(),
            content_type: part.content_type.to_string(),
            href: self.layout.attachment_href(stem, file_name),
            path,
            size: payload.len() as u64,
            is_image,
            renditions,
        }))
    }

    fn write_rendition(
        &self,
        original: &Path,
        folder: &Path,
        file_name: &str,
        rendition: &Rendition,
    ) -> Result<()> {
        let bytes = self
            .resizer
            .render(original, rendition)
            .map_err(|e| SiteError::Rendition {
                name: rendition.name.clone(),
                reason: e.to_string(),
            })?;
        write_atomic(&folder.join(rendition.file_name(file_name)), &bytes)
    }
}

/// SHA-256 of an attachment payload.
pub fn checksum(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
