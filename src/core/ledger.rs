//! The version ledger: one file whose entire content is the latest version.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

pub fn ledger_path(workspace: &Path, name: &str) -> PathBuf {
    workspace.join(name)
}

/// Overwrite the ledger with `version`. No trailing newline is added.
pub fn write(workspace: &Path, name: &str, version: &str) -> Result<PathBuf> {
    let path = ledger_path(workspace, name);
    std::fs::write(&path, version)
        .map_err(|e| Error::ledger_write(path.to_string_lossy(), e.to_string()))?;
    log_status!("ledger", "{} = {}", name, version);
    Ok(path)
}

/// Read the recorded version. `None` when no build has been recorded yet.
pub fn read(workspace: &Path, name: &str) -> Result<Option<String>> {
    let path = ledger_path(workspace, name);
    if !path.exists() {
        return Ok(None);
    }
    let content = io::read_file(&path, "read version ledger")?;
    let version = content.trim();
    Ok((!version.is_empty()).then(|| version.to_string()))
}
