//! Everything that touches the output directory: layout, attachments,
//! renditions, templates and pages.

pub mod attachment;
pub mod layout;
pub mod page;
pub mod rendition;
pub mod template;

pub use attachment::AttachmentSink;
pub use layout::OutputLayout;
pub use page::{PageOutcome, PageWriter};
pub use rendition::{ImageResizer, Resizer};
pub use template::{Renderer, TemplateSet};

use std::io::Write;
use std::path::Path;

use crate::error::{Result, SiteError};

/// Replace `path` with `contents` so that readers never observe a partial file.
///
/// The data goes to a temporary file in the same directory which is then
/// renamed over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| SiteError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| SiteError::io(dir, e))?;
    tmp.write_all(contents)
        .and_then(|()| tmp.flush())
        .map_err(|e| SiteError::io(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| SiteError::io(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| SiteError::io(path, e.error))?;
    Ok(())
}
