//! Shared file-writing helpers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `contents` through a sibling temp file, then rename it over `path`.
///
/// The temp file is `path` with `tmp_extension` (e.g. `"json.tmp"`). Parent
/// directories are created as needed.
pub(crate) fn write_atomic(path: &Path, contents: &str, tmp_extension: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension(tmp_extension);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
