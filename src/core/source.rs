//! Source units and the paths derived from them.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::env::BuildEnv;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::utils::pattern;

/// One plugin or script source file declared in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUnit {
    pub path: PathBuf,
    pub dir: PathBuf,
    pub stem: String,
    pub extension: String,
    /// Handed to the compiler (as opposed to stamp-only).
    pub compile: bool,
}

impl SourceUnit {
    pub fn new(path: PathBuf, manifest: &Manifest) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let compile = manifest.compiles_extension(&extension);

        Self {
            path,
            dir,
            stem,
            extension,
            compile,
        }
    }

    /// `<dir>/<artifact_dir>/<stem>.<artifact_extension>`
    pub fn artifact_path(&self, manifest: &Manifest) -> PathBuf {
        normalize(
            &self
                .dir
                .join(&manifest.artifact_dir)
                .join(format!("{}.{}", self.stem, manifest.artifact_extension)),
        )
    }

    /// Transient compile log next to the source: `<dir>/<stem>.txt`.
    ///
    /// Appended to during the compile and deleted afterwards, so an unrelated
    /// `<stem>.txt` beside the source is echoed as compiler output and lost.
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(format!("{}.txt", self.stem))
    }

    /// Include search path: toolchain includes, shared includes, then per-unit dirs.
    pub fn include_dirs(&self, env: &BuildEnv, manifest: &Manifest) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(toolchain) = &env.toolchain_dir {
            dirs.push(toolchain.join(&manifest.toolchain_include_dir));
        }
        if let Some(shared) = &env.shared_include_dir {
            dirs.push(shared.clone());
        }
        for dir in &manifest.include_dirs {
            dirs.push(normalize(&self.dir.join(dir)));
        }
        dirs
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Expand the manifest's `sources` against the workspace, in declaration order.
///
/// Duplicates (e.g. a file matched by two globs) are kept once. Two compiled
/// units that would write the same artifact are rejected.
pub fn resolve_units(workspace: &Path, manifest: &Manifest) -> Result<Vec<SourceUnit>> {
    let mut seen = HashSet::new();
    let mut units = Vec::new();

    for entry in &manifest.sources {
        for path in pattern::resolve_source_paths(workspace, entry)? {
            let path = normalize(&path);
            if seen.insert(path.clone()) {
                units.push(SourceUnit::new(path, manifest));
            }
        }
    }

    let mut artifacts = HashSet::new();
    for unit in units.iter().filter(|u| u.compile) {
        let artifact = unit.artifact_path(manifest);
        if !artifacts.insert(artifact.clone()) {
            return Err(Error::config_invalid_value(
                "sources",
                Some(unit.path.to_string_lossy().to_string()),
                format!(
                    "Artifact path {} is produced by more than one source unit",
                    artifact.display()
                ),
            ));
        }
    }

    Ok(units)
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvOverrides;
    use crate::manifest;
    use std::fs;
    use tempfile::tempdir;

    fn manifest_json(json: &str) -> Manifest {
        manifest::from_str(json, "inline").unwrap()
    }

    #[test]
    fn unit_attributes_come_from_path() {
        let m = manifest_json(r#"{"sources": ["x"]}"#);
        let unit = SourceUnit::new(PathBuf::from("/ws/Plugin/scripting/amxbans_core.sma"), &m);

        assert_eq!(unit.dir, PathBuf::from("/ws/Plugin/scripting"));
        assert_eq!(unit.stem, "amxbans_core");
        assert_eq!(unit.extension, "sma");
        assert!(unit.compile);
        assert_eq!(unit.display_name(), "amxbans_core.sma");
    }

    #[test]
    fn php_units_are_stamp_only() {
        let m = manifest_json(r#"{"sources": ["x"]}"#);
        let unit = SourceUnit::new(PathBuf::from("/ws/Web/include/config.inc.php"), &m);
        assert_eq!(unit.stem, "config.inc");
        assert!(!unit.compile);
    }

    #[test]
    fn artifact_defaults_to_sibling_of_source() {
        let m = manifest_json(r#"{"sources": ["x"]}"#);
        let unit = SourceUnit::new(PathBuf::from("/ws/family-sharing.sma"), &m);
        assert_eq!(unit.artifact_path(&m), PathBuf::from("/ws/family-sharing.amxx"));
        assert_eq!(unit.log_path(), PathBuf::from("/ws/family-sharing.txt"));
    }

    #[test]
    fn artifact_dir_maps_scripting_to_plugins() {
        let m = manifest_json(r#"{"sources": ["x"], "artifact_dir": "../plugins"}"#);
        let unit = SourceUnit::new(PathBuf::from("/ws/Plugin/scripting/amxbans_main.sma"), &m);
        assert_eq!(
            unit.artifact_path(&m),
            PathBuf::from("/ws/Plugin/plugins/amxbans_main.amxx")
        );
    }

    #[test]
    fn include_dirs_are_ordered() {
        let dir = tempdir().unwrap();
        let m = manifest_json(r#"{"sources": ["x"], "include_dirs": ["include", "../shared"]}"#);
        let env = BuildEnv::from_lookup(
            EnvOverrides {
                workspace: Some(dir.path().to_path_buf()),
                toolchain: Some(PathBuf::from("/opt/amxx")),
                shared_includes: Some(PathBuf::from("/opt/inc")),
                ..Default::default()
            },
            |_| None,
        )
        .unwrap();
        let unit = SourceUnit::new(PathBuf::from("/ws/scripting/a.sma"), &m);

        assert_eq!(
            unit.include_dirs(&env, &m),
            vec![
                PathBuf::from("/opt/amxx/include"),
                PathBuf::from("/opt/inc"),
                PathBuf::from("/ws/scripting/include"),
                PathBuf::from("/ws/shared"),
            ]
        );
    }

    #[test]
    fn resolve_units_keeps_order_and_drops_duplicates() {
        let dir = tempdir().unwrap();
        let scripting = dir.path().join("scripting");
        fs::create_dir(&scripting).unwrap();
        fs::write(scripting.join("b.sma"), "").unwrap();
        fs::write(scripting.join("a.sma"), "").unwrap();

        let m = manifest_json(r#"{"sources": ["scripting/b.sma", "scripting/*.sma"]}"#);
        let units = resolve_units(dir.path(), &m).unwrap();

        let names: Vec<_> = units.iter().map(|u| u.display_name()).collect();
        assert_eq!(names, vec!["b.sma", "a.sma"]);
    }

    #[test]
    fn resolve_units_rejects_colliding_artifacts() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("one")).unwrap();
        fs::create_dir_all(dir.path().join("two")).unwrap();
        fs::write(dir.path().join("one/x.sma"), "").unwrap();
        fs::write(dir.path().join("two/x.sma"), "").unwrap();

        let m = manifest_json(
            r#"{"sources": ["one/x.sma", "two/x.sma"], "artifact_dir": "../plugins"}"#,
        );
        let err = resolve_units(dir.path(), &m).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
    }

    #[test]
    fn resolve_units_reports_missing_source() {
        let dir = tempdir().unwrap();
        let m = manifest_json(r#"{"sources": ["missing.sma"]}"#);
        let err = resolve_units(dir.path(), &m).unwrap_err();
        assert_eq!(err.code.as_str(), "source.not_found");
    }

    #[test]
    fn normalize_resolves_parent_components() {
        assert_eq!(
            normalize(Path::new("/ws/Plugin/scripting/../plugins/./a.amxx")),
            PathBuf::from("/ws/Plugin/plugins/a.amxx")
        );
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }
}
