//! One run: walk every message, write its page, then the index.

use std::collections::{HashMap, HashSet};
use std::iter;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::content::TextNormalizer;
use crate::error::{Result, SiteError};
use crate::hook::{CommandHook, Hook};
use crate::model::message::Message;
use crate::model::result::MessageResult;
use crate::output::{
    AttachmentSink, ImageResizer, OutputLayout, PageOutcome, PageWriter, TemplateSet,
};
use crate::walker::MimeWalker;

/// State that lives exactly as long as one run.
#[derive(Debug, Default)]
pub struct RunContext {
    checksums: HashSet<[u8; 32]>,
    stems: HashMap<String, u32>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an attachment with this checksum was already kept in this run.
    pub fn seen(&self, checksum: &[u8; 32]) -> bool {
        self.checksums.contains(checksum)
    }

    /// Record the checksum of a kept attachment. Returns `false` if it was
    /// already recorded.
    pub fn register(&mut self, checksum: [u8; 32]) -> bool {
        self.checksums.insert(checksum)
    }

    /// Reserve the folder stem for a message.
    ///
    /// The first message with a given date stem gets it unchanged; the k-th
    /// gets `{stem}-{k}`.
    pub fn claim_stem(&mut self, base: &str) -> String {
        let count = self.stems.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{base}-{count}")
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Messages handed to the pipeline.
    pub processed: usize,
    pub written: usize,
    /// Pages left untouched because they already existed.
    pub skipped: usize,
    /// Messages left out of the index.
    pub failed: usize,
    pub attachments: usize,
    pub attachment_bytes: u64,
}

/// The assembled message-to-site pipeline.
pub struct Pipeline {
    normalizer: TextNormalizer,
    sink: AttachmentSink,
    pages: PageWriter,
    hook: Box<dyn Hook>,
}

impl Pipeline {
    pub fn new(
        normalizer: TextNormalizer,
        sink: AttachmentSink,
        pages: PageWriter,
        hook: Box<dyn Hook>,
    ) -> Self {
        Self {
            normalizer,
            sink,
            pages,
            hook,
        }
    }

    /// Wire every component from a validated configuration.
    ///
    /// Templates are loaded here, so a missing template fails before any
    /// message is touched.
    pub fn from_config(config: &Config) -> Result<Self> {
        let template_dir = config
            .templates
            .dir
            .as_deref()
            .ok_or_else(|| SiteError::Config("templates.dir is required".into()))?;
        let templates = TemplateSet::load(
            template_dir,
            iter::once(config.templates.message.as_str())
                .chain(config.templates.index.iter().map(String::as_str)),
        )?;

        let layout = OutputLayout::new(&config.output);
        let sink = AttachmentSink::new(
            layout.clone(),
            config.attachments.renditions.clone(),
            config.attachments.dedup,
            Box::new(ImageResizer::new(config.attachments.max_image_alloc)),
        );
        let pages = PageWriter::new(
            layout,
            Box::new(templates),
            &config.templates,
            &config.output,
        );

        Ok(Self::new(
            TextNormalizer::new(config.text.break_markers.iter().cloned()),
            sink,
            pages,
            Box::new(CommandHook::new(&config.hooks, &config.output.dir)),
        ))
    }

    /// Replace the lifecycle hook.
    pub fn with_hook(mut self, hook: Box<dyn Hook>) -> Self {
        self.hook = hook;
        self
    }

    /// Process `messages` in order and write the index.
    ///
    /// A message that fails is logged and left out; only an index write
    /// failure aborts the run. `progress` receives `(done, total)`.
    pub fn run(
        &mut self,
        messages: &[Message],
        progress: &dyn Fn(usize, usize),
    ) -> Result<RunSummary> {
        let total = messages.len();
        let mut run = RunContext::new();
        let mut summary = RunSummary::default();
        let mut results = Vec::with_capacity(total);

        let walker = MimeWalker::new(&self.normalizer, &self.sink);

        for (sequence, message) in messages.iter().enumerate() {
            progress(sequence, total);
            summary.processed += 1;

            let mut result = match walker.walk(&mut run, message, sequence) {
                Ok(result) => result,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        date = %describe_date(message),
                        sequence,
                        subject = %message.subject,
                        error = %e,
                        "Failed to process message"
                    );
                    continue;
                }
            };
            self.hook.after_read(message, &mut result);

            match self.pages.write(&result, self.hook.as_mut()) {
                Ok(PageOutcome::Written(_)) => summary.written += 1,
                Ok(PageOutcome::Skipped(_)) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        date = %result.sent_date,
                        sequence,
                        error = %e,
                        "Failed to write page"
                    );
                    continue;
                }
            }

            summary.attachments += result.attachments.len();
            summary.attachment_bytes += result.attachments.iter().map(|a| a.size).sum::<u64>();
            results.push(result);
        }
        progress(total, total);

        self.pages.write_index(&results)?;
        self.hook.after_complete(&results, &summary);

        info!(
            processed = summary.processed,
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed,
            attachments = summary.attachments,
            "Run complete"
        );
        Ok(summary)
    }
}

fn describe_date(message: &Message) -> String {
    message
        .sent_date
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}
