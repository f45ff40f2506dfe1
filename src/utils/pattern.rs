//! Source path resolution with glob pattern support.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Resolve a manifest source entry against `base` into concrete files.
///
/// - If the entry contains no glob chars (`*`, `?`, `[`, `]`), returns the joined
///   path after an existence check
/// - If the entry is a glob, returns every matching file in sorted order
/// - Returns error if no files match or the path doesn't exist
pub fn resolve_source_paths(base: &Path, entry: &str) -> Result<Vec<PathBuf>> {
    let joined = base.join(entry);

    if !contains_glob_chars(entry) {
        if joined.is_file() {
            return Ok(vec![joined]);
        }
        return Err(Error::source_not_found(joined.to_string_lossy()));
    }

    let pattern = joined.to_string_lossy().to_string();
    let mut entries: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| {
            Error::validation_invalid_argument(
                "sources",
                format!("Invalid glob pattern '{}': {}", entry, e),
                Some(entry.to_string()),
                None,
            )
        })?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    if entries.is_empty() {
        return Err(Error::validation_invalid_argument(
            "sources",
            format!("No files match pattern: {}", entry),
            Some(entry.to_string()),
            None,
        ));
    }

    entries.sort();
    log_status!("plan", "Resolved '{}' -> {} file(s)", entry, entries.len());
    Ok(entries)
}

pub fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn literal_path_exists() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("test.sma")).unwrap();

        let result = resolve_source_paths(dir.path(), "test.sma").unwrap();
        assert_eq!(result, vec![dir.path().join("test.sma")]);
    }

    #[test]
    fn literal_path_not_exists() {
        let dir = TempDir::new().unwrap();
        let err = resolve_source_paths(dir.path(), "missing.sma").unwrap_err();
        assert_eq!(err.code.as_str(), "source.not_found");
    }

    #[test]
    fn glob_pattern_returns_sorted_matches() {
        let dir = TempDir::new().unwrap();
        let scripting = dir.path().join("scripting");
        fs::create_dir(&scripting).unwrap();
        File::create(scripting.join("b_main.sma")).unwrap();
        File::create(scripting.join("a_core.sma")).unwrap();
        File::create(scripting.join("notes.txt")).unwrap();

        let result = resolve_source_paths(dir.path(), "scripting/*.sma").unwrap();
        assert_eq!(
            result,
            vec![scripting.join("a_core.sma"), scripting.join("b_main.sma")]
        );
    }

    #[test]
    fn glob_pattern_no_matches() {
        let dir = TempDir::new().unwrap();
        let err = resolve_source_paths(dir.path(), "nonexistent-*.sma").unwrap_err();
        assert!(err.details.to_string().contains("No files match pattern"));
    }

    #[test]
    fn glob_pattern_ignores_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("folder.sma")).unwrap();
        assert!(resolve_source_paths(dir.path(), "*.sma").is_err());
    }

    #[test]
    fn test_contains_glob_chars() {
        assert!(contains_glob_chars("scripting/*.sma"));
        assert!(contains_glob_chars("plugin?.sma"));
        assert!(contains_glob_chars("file[0-9].sma"));
        assert!(!contains_glob_chars("scripting/amxbans_core.sma"));
    }
}
