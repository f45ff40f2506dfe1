//! Release manifest: the declared build set and the package mapping table.
//!
//! Every field except `sources` has a default matching the AMX Mod X
//! conventions (`PLUGINVERSION[]` / `@$config` markers, `dev` placeholder,
//! `amxxpc` compiler, `package/` staging tree, `latest.ver` ledger).

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::error::{Error, Result};
use crate::utils::{io, validation};

/// Manifest file looked up in the workspace root when none is given.
pub const DEFAULT_MANIFEST: &str = "pluginpack.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Source units relative to the workspace, in build order. Glob patterns allowed.
    pub sources: Vec<String>,

    /// Extensions (without dot) that are compiled. Other units are stamp-only.
    #[serde(default = "default_compile_extensions")]
    pub compile_extensions: Vec<String>,

    #[serde(default)]
    pub markers: Markers,

    #[serde(default)]
    pub version_from: VersionSource,

    /// Compiler binary name inside the toolchain directory.
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Include directory inside the toolchain directory.
    #[serde(default = "default_toolchain_include_dir")]
    pub toolchain_include_dir: String,

    /// Per-unit include directories, relative to the unit's directory.
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<String>,

    /// Where compiled artifacts land, relative to the unit's directory.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    /// Staging tree, relative to the workspace. Recreated on every run.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    /// Archive destination relative to the workspace. Defaults to the staging tree's parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<String>,

    /// Ledger file name in the workspace root.
    #[serde(default = "default_ledger")]
    pub ledger: String,

    #[serde(default)]
    pub package: Vec<PackageMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Markers {
    #[serde(default = "default_version_declaration")]
    pub version_declaration: String,

    #[serde(default = "default_config_default")]
    pub config_default: String,

    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            version_declaration: default_version_declaration(),
            config_default: default_config_default(),
            placeholder: default_placeholder(),
        }
    }
}

/// Which marker line the version string is read from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    #[default]
    ConfigDefault,
    VersionDeclaration,
}

/// One row of the source → destination table used to build the staging tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageMapping {
    /// File or directory relative to the workspace.
    pub from: String,
    /// Destination relative to the staging root.
    pub to: String,
    /// Skip instead of failing when `from` does not exist.
    #[serde(default)]
    pub optional: bool,
}

fn default_compile_extensions() -> Vec<String> {
    vec!["sma".to_string()]
}

fn default_version_declaration() -> String {
    "PLUGINVERSION[]".to_string()
}

fn default_config_default() -> String {
    "@$config".to_string()
}

fn default_placeholder() -> String {
    "dev".to_string()
}

fn default_compiler() -> String {
    "amxxpc".to_string()
}

fn default_toolchain_include_dir() -> String {
    "include".to_string()
}

fn default_include_dirs() -> Vec<String> {
    vec!["include".to_string()]
}

fn default_artifact_dir() -> String {
    ".".to_string()
}

fn default_artifact_extension() -> String {
    "amxx".to_string()
}

fn default_staging_dir() -> String {
    "package".to_string()
}

fn default_ledger() -> String {
    "latest.ver".to_string()
}

/// Load and validate a manifest file.
pub fn load(path: &Path) -> Result<Manifest> {
    let content = io::read_file(path, "read manifest").map_err(|e| {
        if path.exists() {
            e
        } else {
            Error::config_missing_key("sources", Some(path.to_string_lossy().to_string()))
                .with_hint(format!(
                    "Create {} declaring the source units to build",
                    DEFAULT_MANIFEST
                ))
        }
    })?;
    from_str(&content, &path.to_string_lossy())
}

/// Parse and validate manifest JSON. `origin` names the source in errors.
pub fn from_str(content: &str, origin: &str) -> Result<Manifest> {
    let manifest: Manifest =
        serde_json::from_str(content).map_err(|e| Error::config_invalid_json(origin, e))?;
    manifest.validate()?;
    Ok(manifest)
}

impl Manifest {
    pub fn validate(&self) -> Result<()> {
        validation::require_non_empty_vec(
            &self.sources,
            "sources",
            "Manifest declares no sources",
        )?;

        require_value("markers.version_declaration", &self.markers.version_declaration)?;
        require_value("markers.config_default", &self.markers.config_default)?;
        require_value("markers.placeholder", &self.markers.placeholder)?;
        require_value("compiler", &self.compiler)?;
        require_value("artifact_extension", &self.artifact_extension)?;

        require_relative("staging_dir", &self.staging_dir)?;
        if Path::new(&self.staging_dir)
            .components()
            .all(|c| matches!(c, Component::CurDir))
        {
            return Err(Error::config_invalid_value(
                "staging_dir",
                Some(self.staging_dir.clone()),
                "Staging tree cannot be the workspace root",
            ));
        }

        if let Some(dir) = &self.archive_dir {
            require_relative("archive_dir", dir)?;
        }

        if Path::new(&self.ledger).components().count() != 1
            || !matches!(Path::new(&self.ledger).components().next(), Some(Component::Normal(_)))
        {
            return Err(Error::config_invalid_value(
                "ledger",
                Some(self.ledger.clone()),
                "Ledger must be a plain file name",
            ));
        }

        for mapping in &self.package {
            require_value("package.from", &mapping.from)?;
            require_relative("package.to", &mapping.to)?;
        }

        Ok(())
    }

    /// Whether a unit with this extension is handed to the compiler.
    pub fn compiles_extension(&self, extension: &str) -> bool {
        self.compile_extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

fn require_value(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config_invalid_value(key, None, "Value cannot be empty"));
    }
    Ok(())
}

/// Relative path that stays inside its base: no root, no `..`.
fn require_relative(key: &str, value: &str) -> Result<()> {
    require_value(key, value)?;
    let escapes = Path::new(value)
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_) | Component::ParentDir));
    if escapes {
        return Err(Error::config_invalid_value(
            key,
            Some(value.to_string()),
            "Path must be relative and must not contain '..'",
        ));
    }
    Ok(())
}
