//! Message pages and index pages.

use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::{OutputConfig, TemplateConfig};
use crate::content::text::plain_to_html;
use crate::error::Result;
use crate::hook::Hook;
use crate::model::result::MessageResult;
use crate::output::layout::OutputLayout;
use crate::output::template::Renderer;
use crate::output::write_atomic;

/// What [`PageWriter::write`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Written(PathBuf),
    /// A non-empty page was already there and overwrite is off.
    Skipped(PathBuf),
}

/// Renders one page per message and the index pages.
pub struct PageWriter {
    layout: OutputLayout,
    renderer: Box<dyn Renderer>,
    message_template: String,
    index_templates: Vec<String>,
    overwrite: bool,
    display_date_format: String,
}

impl PageWriter {
    pub fn new(
        layout: OutputLayout,
        renderer: Box<dyn Renderer>,
        templates: &TemplateConfig,
        output: &OutputConfig,
    ) -> Self {
        Self {
            layout,
            renderer,
            message_template: templates.message.clone(),
            index_templates: templates.index.clone(),
            overwrite: output.overwrite,
            display_date_format: output.display_date_format.clone(),
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Whether a non-empty page already exists for `result`.
    pub fn exists(&self, result: &MessageResult) -> bool {
        std::fs::metadata(self.layout.page_path(result))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// Render and write the page for `result`, unless it exists and
    /// overwrite is off.
    pub fn write(&self, result: &MessageResult, hook: &mut dyn Hook) -> Result<PageOutcome> {
        let path = self.layout.page_path(result);
        if !self.overwrite && self.exists(result) {
            debug!(page = %path.display(), "Page exists, skipping");
            return Ok(PageOutcome::Skipped(path));
        }

        let mut context = self.message_context(result)?;
        hook.before_write(result, &path, &mut context);
        let html = self.renderer.render(&self.message_template, &context)?;

        write_atomic(&path, html.as_bytes())?;
        hook.after_write(result, &path);

        debug!(page = %path.display(), "Wrote page");
        Ok(PageOutcome::Written(path))
    }

    /// Render every index template with all `results`, oldest first.
    ///
    /// Index pages are rewritten on every run.
    pub fn write_index(&self, results: &[MessageResult]) -> Result<Vec<PathBuf>> {
        let mut sorted: Vec<&MessageResult> = results.iter().collect();
        sorted.sort_by_key(|r| (r.sent_date, r.sequence));

        let messages = sorted
            .iter()
            .map(|r| self.summary_context(r))
            .collect::<Result<Vec<Value>>>()?;
        let context = json!({
            "count": messages.len(),
            "messages": messages,
        });

        let mut written = Vec::with_capacity(self.index_templates.len());
        for template in &self.index_templates {
            let html = self.renderer.render(template, &context)?;
            let path = self.layout.index_path(&index_file_name(template));
            write_atomic(&path, html.as_bytes())?;
            info!(index = %path.display(), messages = sorted.len(), "Wrote index");
            written.push(path);
        }
        Ok(written)
    }

    /// Message fields plus the links a page template needs.
    ///
    /// `root` leads from the page back to the output directory, so
    /// `{{ root }}{{ attachment.href }}` resolves from any page depth.
    pub fn message_context(&self, result: &MessageResult) -> Result<Value> {
        let mut ctx = self.base_context(result)?;
        ctx.insert(
            "attachment_folder".into(),
            Value::String(format!(
                "{}{}",
                self.layout.page_root_prefix(),
                self.layout.attachment_folder_href(&result.stem)
            )),
        );
        ctx.insert("root".into(), Value::String(self.layout.page_root_prefix()));
        Ok(Value::Object(ctx))
    }

    fn summary_context(&self, result: &MessageResult) -> Result<Value> {
        self.base_context(result).map(Value::Object)
    }

    fn base_context(&self, result: &MessageResult) -> Result<Map<String, Value>> {
        let mut ctx = match serde_json::to_value(result)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ctx.insert("page".into(), Value::String(self.layout.page_href(result)));
        ctx.insert(
            "date".into(),
            Value::String(result.sent_date.format(&self.display_date_format).to_string()),
        );
        let body_html = match &result.body {
            Some(body) if result.body_is_html => body.clone(),
            Some(body) => plain_to_html(body),
            None => String::new(),
        };
        ctx.insert("body_html".into(), Value::String(body_html));
        Ok(ctx)
    }
}

/// `index.html.j2` → `index.html`; other names are used as they are.
pub fn index_file_name(template: &str) -> String {
    let name = Path::new(template)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| template.to_string());
    name.strip_suffix(".j2")
        .or_else(|| name.strip_suffix(".jinja"))
        .map(String::from)
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::NoopHook;
    use chrono::{TimeZone, Utc};

    /// Emits the template name and the compact JSON context.
    struct EchoRenderer;

    impl Renderer for EchoRenderer {
        fn render(&self, name: &str, context: &Value) -> Result<String> {
            Ok(format!("{name}:{context}"))
        }
    }

    fn writer(root: &Path, overwrite: bool) -> PageWriter {
        let output = OutputConfig {
            dir: root.to_path_buf(),
            overwrite,
            ..OutputConfig::default()
        };
        let templates = TemplateConfig {
            index: vec!["index.html".to_string(), "feed.xml.j2".to_string()],
            ..TemplateConfig::default()
        };
        PageWriter::new(
            OutputLayout::new(&output),
            Box::new(EchoRenderer),
            &templates,
            &output,
        )
    }

    fn result(day: u32, subject: &str, sequence: usize) -> MessageResult {
        let date = Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap();
        let mut r = MessageResult::new(
            subject,
            "A",
            date,
            date.format("%Y-%m-%d-%H-%M-%S").to_string(),
            sequence,
        );
        r.body = Some("line one\nline <two>".to_string());
        r
    }

    #[test]
    fn test_write_then_skip() {
        let dir = tempfile::tempdir().unwrap();
        let pages = writer(dir.path(), false);
        let r = result(2, "Hello", 0);

        assert!(!pages.exists(&r));
        assert!(matches!(
            pages.write(&r, &mut NoopHook).unwrap(),
            PageOutcome::Written(_)
        ));
        assert!(pages.exists(&r));
        assert!(matches!(
            pages.write(&r, &mut NoopHook).unwrap(),
            PageOutcome::Skipped(_)
        ));
    }

    /// Adds a `banner` key to every page context.
    struct BannerHook;

    impl Hook for BannerHook {
        fn before_write(&mut self, _result: &MessageResult, page: &Path, context: &mut Value) {
            assert!(!page.exists());
            context["banner"] = Value::String("from the hook".to_string());
        }
    }

    #[test]
    fn test_before_write_can_extend_the_context() {
        let dir = tempfile::tempdir().unwrap();
        let pages = writer(dir.path(), false);
        let r = result(2, "Hello", 0);

        pages.write(&r, &mut BannerHook).unwrap();
        let html = std::fs::read_to_string(pages.layout().page_path(&r)).unwrap();
        assert!(html.contains("\"banner\":\"from the hook\""));
    }

    #[test]
    fn test_empty_page_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let pages = writer(dir.path(), false);
        let r = result(2, "Hello", 0);
        let path = pages.layout().page_path(&r);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        assert!(!pages.exists(&r));
        assert!(matches!(
            pages.write(&r, &mut NoopHook).unwrap(),
            PageOutcome::Written(_)
        ));
    }

    #[test]
    fn test_overwrite_rewrites_existing_page() {
        let dir = tempfile::tempdir().unwrap();
        let pages = writer(dir.path(), true);
        let r = result(2, "Hello", 0);
        let path = pages.layout().page_path(&r);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stale").unwrap();

        pages.write(&r, &mut NoopHook).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("message.html:"));
    }

    #[test]
    fn test_message_context_extras() {
        let dir = tempfile::tempdir().unwrap();
        let pages = writer(dir.path(), false);
        let ctx = pages.message_context(&result(2, "Hello", 0)).unwrap();

        assert_eq!(ctx["root"], "../");
        assert_eq!(ctx["attachment_folder"], "../images/2024-01-02-10-00-00");
        assert_eq!(ctx["page"], "messages/2024-01-02-10-00-00-hello.html");
        assert_eq!(ctx["date"], "Jan 2, 2024");
        assert_eq!(ctx["body_html"], "line one<br>\nline &lt;two&gt;");
        assert_eq!(ctx["subject"], "Hello");
    }

    #[test]
    fn test_index_sorted_by_date_then_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let pages = writer(dir.path(), false);
        let results = vec![
            result(5, "late", 0),
            result(1, "early", 1),
            result(3, "middle b", 3),
            result(3, "middle a", 2),
        ];

        let written = pages.write_index(&results).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("index.html"), dir.path().join("feed.xml")]
        );

        let html = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        let pos = |s: &str| html.find(s).unwrap();
        assert!(pos("\"early\"") < pos("\"middle a\""));
        assert!(pos("\"middle a\"") < pos("\"middle b\""));
        assert!(pos("\"middle b\"") < pos("\"late\""));
        assert!(html.contains("\"count\":4"));
    }

    #[test]
    fn test_index_file_name() {
        assert_eq!(index_file_name("index.html"), "index.html");
        assert_eq!(index_file_name("feed.xml.j2"), "feed.xml");
        assert_eq!(index_file_name("archive.html.jinja"), "archive.html");
        assert_eq!(index_file_name("nested/list.html"), "list.html");
    }
}
