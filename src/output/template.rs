//! Template loading and rendering.

use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde_json::Value;

use crate::error::{Result, SiteError};

/// Renders a named template against a JSON context.
pub trait Renderer {
    fn render(&self, name: &str, context: &Value) -> Result<String>;
}

/// A fixed set of Jinja templates read from one directory.
///
/// Templates ending in `.html` or `.htm` are auto-escaped; mark trusted
/// values with `|safe`.
pub struct TemplateSet {
    env: Environment<'static>,
    dir: PathBuf,
}

impl TemplateSet {
    /// Load and compile every template in `names` from `dir`.
    pub fn load<'a>(dir: &Path, names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        for name in names {
            let path = dir.join(name);
            let source = std::fs::read_to_string(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SiteError::TemplateNotFound {
                        name: name.to_string(),
                        dir: dir.to_path_buf(),
                    }
                } else {
                    SiteError::io(&path, e)
                }
            })?;
            env.add_template_owned(name.to_string(), source)?;
            tracing::debug!(template = name, "Loaded template");
        }

        Ok(Self {
            env,
            dir: dir.to_path_buf(),
        })
    }
}

impl Renderer for TemplateSet {
    fn render(&self, name: &str, context: &Value) -> Result<String> {
        let template = self.env.get_template(name).map_err(|_| SiteError::TemplateNotFound {
            name: name.to_string(),
            dir: self.dir.clone(),
        })?;
        Ok(template.render(context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_escapes_html_unless_safe() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("page.html"),
            "<h1>{{ subject }}</h1>{{ body|safe }}",
        )
        .unwrap();
        let set = TemplateSet::load(dir.path(), ["page.html"]).unwrap();
        let out = set
            .render("page.html", &json!({"subject": "a < b", "body": "<p>x</p>"}))
            .unwrap();
        assert_eq!(out, "<h1>a &lt; b</h1><p>x</p>");
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateSet::load(dir.path(), ["absent.html"]).err().unwrap();
        assert!(matches!(err, SiteError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_unloaded_template_name() {
        let dir = tempfile::tempdir().unwrap();
        let set = TemplateSet::load(dir.path(), []).unwrap();
        assert!(set.render("other.html", &json!({})).is_err());
    }

    #[test]
    fn test_syntax_error_is_reported_at_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.html"), "{% for %}").unwrap();
        assert!(matches!(
            TemplateSet::load(dir.path(), ["bad.html"]),
            Err(SiteError::Template(_))
        ));
    }
}
