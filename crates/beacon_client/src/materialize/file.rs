use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::{info, warn};

use crate::errors::Result;

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Write `bytes` to `path`, replacing any existing file.
///
/// Data goes to a temporary file next to the target which is renamed into
/// place, so a failed write never leaves a partial file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    info!(path = %path.display(), len = bytes.len(), "wrote file");
    Ok(())
}

/// Build a directory tree with `build` and move it to `path`, replacing any
/// existing directory there.
///
/// An existing target is moved aside first and only deleted once the new tree
/// is in place. If the final rename fails the old target is put back.
pub fn write_dir_atomic<F>(path: &Path, build: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let tmp = Builder::new()
        .prefix(".beacon-")
        .tempdir_in(parent_dir(path))?;
    let staged = tmp.path().join("out");
    build(&staged)?;

    let previous = tmp.path().join("previous");
    let replacing = fs::symlink_metadata(path).is_ok();
    if replacing {
        fs::rename(path, &previous)?;
    }
    if let Err(e) = fs::rename(&staged, path) {
        if replacing {
            if let Err(restore) = fs::rename(&previous, path) {
                warn!(path = %path.display(), %restore, "failed to restore previous output");
            }
        }
        return Err(e.into());
    }
    // The previous tree goes away with `tmp`.
    info!(path = %path.display(), "wrote directory");
    Ok(())
}
