//! Crash-safe file replacement shared by the config file and the file
//! token store.

use std::path::Path;

/// Write `contents` to `path` through a sibling temp file and a rename, so a
/// crash never leaves a truncated file behind. Parent directories are
/// created as needed.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("create directory {:?}: {}", parent, e))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents).map_err(|e| format!("write {:?}: {}", tmp_path, e))?;

    // Windows rename refuses to replace an existing file.
    if cfg!(windows) && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(format!("remove {:?}: {}", path, e));
            }
        }
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("rename {:?} to {:?}: {}", tmp_path, path, e))
}
