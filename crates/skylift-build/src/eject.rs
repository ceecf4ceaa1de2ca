use std::path::{Path, PathBuf};

use crate::entrypoint::ENTRY_FILE;

/// Folder inside an application directory that holds ejected files.
pub const EJECT_DIR: &str = ".skylift";

/// Where [`eject`] writes the entry point for `app_dir`.
pub fn ejected_path(app_dir: &Path) -> PathBuf {
    app_dir.join(EJECT_DIR).join(ENTRY_FILE)
}

/// Writes the generated entry point as a standalone file inside the
/// application, for running or inspecting it outside the bundle.
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn eject(app_dir: &Path, entry_point: &str, overwrite: bool) -> Result<PathBuf, EjectError> {
    let eject_dir = app_dir.join(EJECT_DIR);
    std::fs::create_dir_all(&eject_dir).map_err(|e| EjectError::CreateDir {
        path: eject_dir.clone(),
        source: e,
    })?;

    let path = ejected_path(app_dir);
    if path.exists() && !overwrite {
        return Err(EjectError::AlreadyEjected(path));
    }

    std::fs::write(&path, entry_point).map_err(|e| EjectError::Write {
        path: path.clone(),
        source: e,
    })?;

    Ok(path)
}

/// Check if the application has an ejected entry point.
pub fn is_ejected(app_dir: &Path) -> bool {
    ejected_path(app_dir).exists()
}

#[derive(Debug, thiserror::Error)]
pub enum EjectError {
    #[error("failed to create .skylift directory at {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("entry point already ejected at {0} — pass --force to overwrite")]
    AlreadyEjected(PathBuf),
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
