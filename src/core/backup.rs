//! Backup copies taken before a file is rewritten

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::errors::{Result, TranslationError};

/// A byte-identical copy of a file at `<original>.bak`.
///
/// Backups are never deleted or restored automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCopy {
    pub original: PathBuf,
    pub path: PathBuf,
    pub bytes: u64,
}

/// `<path>.bak`, keeping the original extension (`a.txt` -> `a.txt.bak`)
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy `path` to `<path>.bak`, overwriting any earlier backup
pub async fn backup(path: &Path) -> Result<BackupCopy> {
    let target = backup_path(path);

    let bytes = tokio::fs::copy(path, &target)
        .await
        .map_err(|e| TranslationError::BackupError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    info!("Backup created: {}", target.display());

    Ok(BackupCopy {
        original: path.to_path_buf(),
        path: target,
        bytes,
    })
}
