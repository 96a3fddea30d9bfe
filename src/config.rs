//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. the `--config` command-line argument
//! 2. `$MAILSITE_CONFIG` (environment variable)
//! 3. `~/.config/mailsite/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsite\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! Unknown keys are rejected rather than ignored, and [`Config::validate`]
//! must pass before a run starts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteError};
use crate::model::rendition::Rendition;
use crate::output::layout::DATE_PLACEHOLDER;
use crate::source::imap::ImapServer;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Logging settings.
    pub general: GeneralConfig,
    /// Where messages come from.
    pub source: SourceConfig,
    /// Output directory layout and overwrite policy.
    pub output: OutputConfig,
    /// Page and index templates.
    pub templates: TemplateConfig,
    /// Body trimming.
    pub text: TextConfig,
    /// Attachment deduplication and image renditions.
    pub attachments: AttachmentConfig,
    /// Shell commands run at lifecycle points.
    pub hooks: HookConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Directory for `mailsite.log`. Defaults to the user cache directory.
    pub log_dir: Option<PathBuf>,
}

/// Mailbox source settings. Exactly one of `path` and `url` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// An MBOX file or a directory of `.eml` files.
    pub path: Option<PathBuf>,
    /// IMAPS server, `imaps://host[:port]`.
    pub url: Option<String>,
    pub username: Option<String>,
    /// Falls back to `$MAILSITE_PASSWORD`.
    pub password: Option<String>,
    /// Server folder, `INBOX` when unset.
    pub folder: Option<String>,
    /// Only process messages whose subject contains this text.
    pub search_subject: Option<String>,
}

/// Output directory layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Root of the generated site.
    pub dir: PathBuf,
    /// Sub-directory for message pages (may be empty).
    pub messages_sub_dir: String,
    /// Sub-directory for attachment folders (may be empty).
    pub images_sub_dir: String,
    /// Page file name; `{date}` is the date stem, `{slug}` the subject slug.
    pub file_name_format: String,
    /// `strftime` format of the date stem used for pages and attachment folders.
    pub file_date_format: String,
    /// `strftime` format of the human-readable date handed to templates.
    pub display_date_format: String,
    /// Re-render pages that already exist.
    pub overwrite: bool,
}

/// Template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Directory containing the templates.
    pub dir: Option<PathBuf>,
    /// Template rendered once per message.
    pub message: String,
    /// Templates rendered with the full message list; each produces a file
    /// of the same name (minus `.j2`/`.jinja`) in the output root.
    pub index: Vec<String>,
}

/// Body trimming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// Text is cut before the earliest occurrence of any of these.
    pub break_markers: Vec<String>,
}

/// Attachment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttachmentConfig {
    /// Keep only the first copy of byte-identical attachments in a run.
    pub dedup: bool,
    /// Upper bound in bytes for decoding one image while rendering renditions.
    pub max_image_alloc: u64,
    /// Derived images created for every image attachment.
    pub renditions: Vec<Rendition>,
}

/// Lifecycle shell commands, run with `sh -c`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    /// Run after each page is written; `MAILSITE_PAGE` holds its path.
    pub after_write: Option<String>,
    /// Run once after the index is written.
    pub after_complete: Option<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("site"),
            messages_sub_dir: "messages".to_string(),
            images_sub_dir: "images".to_string(),
            file_name_format: "{date}-{slug}.html".to_string(),
            file_date_format: "%Y-%m-%d-%H-%M-%S".to_string(),
            display_date_format: "%b %-d, %Y".to_string(),
            overwrite: false,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: None,
            message: "message.html".to_string(),
            index: vec!["index.html".to_string()],
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            break_markers: [
                "<div class=\"gmail_quote",
                "<hr",
                "Sent from my iPhone",
                "Sent from my iPad",
                "Sent from my mobile",
                "Technical details of permanent failure",
                "Forwarded message",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            dedup: true,
            max_image_alloc: 512 * 1024 * 1024, // 512 MB
            renditions: vec![Rendition {
                name: "thumbnail".to_string(),
                width: 100,
                height: 100,
                fill: true,
            }],
        }
    }
}

// ── Validation ──────────────────────────────────────────────────

impl Config {
    /// Check that the configuration is complete and self-consistent.
    pub fn validate(&self) -> Result<()> {
        match (&self.source.path, &self.source.url) {
            (None, None) => {
                return Err(SiteError::Config(
                    "source.path or source.url is required".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(SiteError::Config(
                    "source.path and source.url cannot both be set".into(),
                ))
            }
            (None, Some(url)) => {
                ImapServer::parse(url)?;
                if self.source.username.is_none() {
                    return Err(SiteError::Config(
                        "source.username is required with source.url".into(),
                    ));
                }
            }
            (Some(_), None) => {}
        }
        if self.templates.dir.is_none() {
            return Err(SiteError::Config("templates.dir is required".into()));
        }
        if self.templates.message.trim().is_empty() {
            return Err(SiteError::Config("templates.message is empty".into()));
        }
        if self.templates.index.is_empty() {
            return Err(SiteError::Config(
                "templates.index needs at least one template".into(),
            ));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(SiteError::Config("output.dir is empty".into()));
        }
        if !self.output.file_name_format.contains(DATE_PLACEHOLDER) {
            return Err(SiteError::Config(format!(
                "output.file_name_format must contain {DATE_PLACEHOLDER}"
            )));
        }
        check_strftime("output.file_date_format", &self.output.file_date_format)?;
        check_strftime(
            "output.display_date_format",
            &self.output.display_date_format,
        )?;

        let mut names = HashSet::new();
        for rendition in &self.attachments.renditions {
            if rendition.name.is_empty() || rendition.name.contains(['/', '\\']) {
                return Err(SiteError::Config(format!(
                    "invalid rendition name '{}'",
                    rendition.name
                )));
            }
            if rendition.width == 0 || rendition.height == 0 {
                return Err(SiteError::Config(format!(
                    "rendition '{}' must have a non-zero width and height",
                    rendition.name
                )));
            }
            if !names.insert(rendition.name.as_str()) {
                return Err(SiteError::Config(format!(
                    "duplicate rendition name '{}'",
                    rendition.name
                )));
            }
        }
        Ok(())
    }
}

/// Reject strftime strings chrono would refuse to format.
fn check_strftime(key: &str, format: &str) -> Result<()> {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SiteError::Config(format!(
            "{key} '{format}' is not a valid strftime format"
        )));
    }
    Ok(())
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from `explicit`, or from the standard locations.
///
/// An explicitly named file must exist. Without one, a missing standard
/// file yields the defaults. A file that exists but does not parse is
/// always an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("No config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| SiteError::io(&path, e))?;
    let config = parse_config(&contents)
        .map_err(|e| SiteError::Config(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse a TOML document into a [`Config`].
pub fn parse_config(contents: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(contents)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSITE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailsite").join("config.toml"))
}

/// Return the directory for the log file.
pub fn log_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.log_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsite")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        let mut cfg = Config::default();
        cfg.source.path = Some(PathBuf::from("archive.mbox"));
        cfg.templates.dir = Some(PathBuf::from("templates"));
        cfg
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.output.messages_sub_dir, "messages");
        assert_eq!(cfg.output.file_name_format, "{date}-{slug}.html");
        assert!(cfg.attachments.dedup);
        assert!(!cfg.output.overwrite);
        assert_eq!(cfg.attachments.renditions.len(), 1);
        assert!(cfg
            .text
            .break_markers
            .iter()
            .any(|m| m.contains("gmail_quote")));
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = valid();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed = parse_config(&toml_str).expect("deserialize");
        assert_eq!(parsed.source.path, cfg.source.path);
        assert_eq!(parsed.attachments.renditions, cfg.attachments.renditions);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[source]
path = "list.mbox"
search_subject = "[ride]"

[output]
dir = "public"
overwrite = true

[[attachments.renditions]]
name = "small"
width = 320
height = 240

[[attachments.renditions]]
name = "square"
width = 150
height = 150
fill = true
"#;
        let cfg = parse_config(partial).expect("parse partial");
        assert_eq!(cfg.source.search_subject.as_deref(), Some("[ride]"));
        assert_eq!(cfg.output.dir, PathBuf::from("public"));
        assert!(cfg.output.overwrite);
        assert_eq!(cfg.output.images_sub_dir, "images");
        assert_eq!(cfg.attachments.renditions.len(), 2);
        assert!(!cfg.attachments.renditions[0].fill);
        assert!(cfg.attachments.renditions[1].fill);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(parse_config("[output]\nsub_dir = \"x\"\n").is_err());
        assert!(parse_config("[mystery]\nkey = 1\n").is_err());
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_source_and_templates() {
        let mut cfg = valid();
        cfg.source.path = None;
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.templates.dir = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_remote_source() {
        let mut cfg = valid();
        cfg.source.path = None;
        cfg.source.url = Some("imaps://imap.example.com".to_string());
        assert!(cfg.validate().is_err(), "username is missing");

        cfg.source.username = Some("list@example.com".to_string());
        assert!(cfg.validate().is_ok());

        cfg.source.path = Some(PathBuf::from("archive.mbox"));
        assert!(cfg.validate().is_err(), "path and url together");

        cfg.source.path = None;
        cfg.source.url = Some("pop3://mail.example.com".to_string());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_remote_source() {
        let cfg = parse_config(
            "[source]\nurl = \"imaps://imap.example.com:993\"\nusername = \"me\"\nfolder = \"Lists/ride\"\n",
        )
        .expect("parse remote source");
        assert_eq!(cfg.source.folder.as_deref(), Some("Lists/ride"));
        assert!(cfg.source.password.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_formats() {
        let mut cfg = valid();
        cfg.output.file_name_format = "{slug}.html".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.output.file_date_format = "%Y-%Q".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_renditions() {
        let mut cfg = valid();
        cfg.attachments.renditions.push(cfg.attachments.renditions[0].clone());
        assert!(cfg.validate().is_err());

        let mut cfg = valid();
        cfg.attachments.renditions[0].width = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(load_config(Some(Path::new("/no/such/mailsite.toml"))).is_err());
    }
}
