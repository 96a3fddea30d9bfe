//! Lifecycle callbacks around a run.
//!
//! A [`Hook`] is handed to the pipeline at start-up. Every method has an
//! empty default so implementors override only what they need.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HookConfig;
use crate::model::message::Message;
use crate::model::result::MessageResult;
use crate::pipeline::RunSummary;

pub trait Hook {
    /// Called for each message once it has been walked, before its page is
    /// considered. Changes to `result` carry into the page and the index.
    fn after_read(&mut self, _message: &Message, _result: &mut MessageResult) {}

    /// Called before the page at `page` is rendered. `context` is what the
    /// template will see; keys added or changed here show up in the page.
    fn before_write(&mut self, _result: &MessageResult, _page: &Path, _context: &mut Value) {}

    /// Called after `page` has been written.
    fn after_write(&mut self, _result: &MessageResult, _page: &Path) {}

    /// Called once after the index pages are written.
    fn after_complete(&mut self, _results: &[MessageResult], _summary: &RunSummary) {}
}

/// Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl Hook for NoopHook {}

/// Runs configured shell commands.
///
/// `after_write` gets `MAILSITE_PAGE`, `MAILSITE_SUBJECT` and `MAILSITE_DATE`;
/// `after_complete` gets `MAILSITE_OUTPUT` and `MAILSITE_COUNT`. A failing
/// command is logged and the run continues.
#[derive(Debug, Clone)]
pub struct CommandHook {
    after_write: Option<String>,
    after_complete: Option<String>,
    output_dir: PathBuf,
}

impl CommandHook {
    pub fn new(config: &HookConfig, output_dir: &Path) -> Self {
        Self {
            after_write: config.after_write.clone(),
            after_complete: config.after_complete.clone(),
            output_dir: output_dir.to_path_buf(),
        }
    }
}

impl Hook for CommandHook {
    fn after_write(&mut self, result: &MessageResult, page: &Path) {
        if let Some(cmd) = &self.after_write {
            run_command(
                "after_write",
                cmd,
                &[
                    ("MAILSITE_PAGE", page.display().to_string()),
                    ("MAILSITE_SUBJECT", result.subject.clone()),
                    ("MAILSITE_DATE", result.sent_date.to_rfc3339()),
                ],
            );
        }
    }

    fn after_complete(&mut self, results: &[MessageResult], _summary: &RunSummary) {
        if let Some(cmd) = &self.after_complete {
            run_command(
                "after_complete",
                cmd,
                &[
                    ("MAILSITE_OUTPUT", self.output_dir.display().to_string()),
                    ("MAILSITE_COUNT", results.len().to_string()),
                ],
            );
        }
    }
}

fn run_command(hook: &str, cmd: &str, env: &[(&str, String)]) {
    let mut command = shell(cmd);
    for (key, value) in env {
        command.env(key, value);
    }
    debug!(hook, cmd, "Running hook command");
    match command.status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(hook, cmd, %status, "Hook command failed"),
        Err(e) => warn!(hook, cmd, error = %e, "Could not start hook command"),
    }
}

#[cfg(unix)]
fn shell(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(not(unix))]
fn shell(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}
