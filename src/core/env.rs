//! Build environment sourced from CI variables, with command-line overrides.
//!
//! Established once before the pipeline runs and never mutated afterwards.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::source::normalize;
use crate::utils::validation;

/// Workspace root checked out by CI.
pub const WORKSPACE_VAR: &str = "WORKSPACE";
/// Revision number substituted for the version placeholder.
pub const BUILD_ID_VAR: &str = "MERCURIAL_REVISION_NUMBER";
/// AMX Mod X release directory holding the compiler binary.
pub const TOOLCHAIN_VAR: &str = "AMXXRELEASE";
/// Shared include directory passed to every compile.
pub const SHARED_INCLUDES_VAR: &str = "AMXXINCLUDES";

/// Values given explicitly on the command line. Each wins over its variable.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub workspace: Option<PathBuf>,
    pub build_id: Option<String>,
    pub toolchain: Option<PathBuf>,
    pub shared_includes: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEnv {
    pub workspace: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_include_dir: Option<PathBuf>,
}

impl BuildEnv {
    /// Resolve from the process environment.
    pub fn resolve(overrides: EnvOverrides) -> Result<Self> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for variables. Empty values count as unset.
    pub fn from_lookup<F>(overrides: EnvOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cwd = std::env::current_dir().map_err(|e| {
            Error::internal_io(e.to_string(), Some("resolve working directory".to_string()))
        })?;
        // The compiler runs from the toolchain directory, so every path handed
        // to it must be absolute.
        let absolute = |path: PathBuf| normalize(&cwd.join(path));

        let workspace = overrides
            .workspace
            .or_else(|| var(WORKSPACE_VAR).map(PathBuf::from))
            .map(absolute)
            .unwrap_or_else(|| cwd.clone());

        if !workspace.is_dir() {
            return Err(Error::validation_invalid_argument(
                "workspace",
                format!("Workspace is not a directory: {}", workspace.display()),
                None,
                None,
            ));
        }

        let build_id = match overrides.build_id.or_else(|| var(BUILD_ID_VAR)) {
            Some(id) => Some(validation::require_token(&id, "build_id")?.to_string()),
            None => None,
        };

        Ok(Self {
            workspace,
            build_id,
            toolchain_dir: overrides
                .toolchain
                .or_else(|| var(TOOLCHAIN_VAR).map(PathBuf::from))
                .map(absolute),
            shared_include_dir: overrides
                .shared_includes
                .or_else(|| var(SHARED_INCLUDES_VAR).map(PathBuf::from))
                .map(absolute),
        })
    }

    pub fn require_build_id(&self) -> Result<&str> {
        validation::require_with_hints(
            self.build_id.as_deref(),
            "build_id",
            "No build identifier provided",
            vec![
                format!("Set {} in the environment", BUILD_ID_VAR),
                "Or pass --build-id <id>".to_string(),
            ],
        )
    }

    pub fn require_toolchain(&self) -> Result<&Path> {
        let dir = validation::require_with_hints(
            self.toolchain_dir.as_deref(),
            "toolchain",
            "No compiler toolchain directory provided",
            vec![
                format!("Set {} to the AMX Mod X release directory", TOOLCHAIN_VAR),
                "Or pass --toolchain <dir>".to_string(),
            ],
        )?;

        if !dir.is_dir() {
            return Err(Error::validation_invalid_argument(
                "toolchain",
                format!("Toolchain directory does not exist: {}", dir.display()),
                None,
                None,
            ));
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(vars: HashMap<&'static str, String>) -> impl Fn(&str) -> Option<String> {
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn variables_populate_env() {
        let dir = tempdir().unwrap();
        let vars = HashMap::from([
            (WORKSPACE_VAR, dir.path().to_string_lossy().to_string()),
            (BUILD_ID_VAR, "42".to_string()),
            (TOOLCHAIN_VAR, "/opt/amxx".to_string()),
            (SHARED_INCLUDES_VAR, "/opt/includes".to_string()),
        ]);

        let env = BuildEnv::from_lookup(EnvOverrides::default(), lookup_from(vars)).unwrap();

        assert_eq!(env.workspace, dir.path());
        assert_eq!(env.build_id.as_deref(), Some("42"));
        assert_eq!(env.toolchain_dir, Some(PathBuf::from("/opt/amxx")));
        assert_eq!(env.shared_include_dir, Some(PathBuf::from("/opt/includes")));
    }

    #[test]
    fn overrides_win_over_variables() {
        let dir = tempdir().unwrap();
        let vars = HashMap::from([(BUILD_ID_VAR, "42".to_string())]);
        let overrides = EnvOverrides {
            workspace: Some(dir.path().to_path_buf()),
            build_id: Some("77".to_string()),
            ..Default::default()
        };

        let env = BuildEnv::from_lookup(overrides, lookup_from(vars)).unwrap();
        assert_eq!(env.require_build_id().unwrap(), "77");
    }

    #[test]
    fn empty_variables_count_as_unset() {
        let dir = tempdir().unwrap();
        let vars = HashMap::from([
            (WORKSPACE_VAR, dir.path().to_string_lossy().to_string()),
            (BUILD_ID_VAR, "  ".to_string()),
            (SHARED_INCLUDES_VAR, String::new()),
        ]);

        let env = BuildEnv::from_lookup(EnvOverrides::default(), lookup_from(vars)).unwrap();
        assert!(env.build_id.is_none());
        assert!(env.shared_include_dir.is_none());
        assert!(env.require_build_id().is_err());
    }

    #[test]
    fn rejects_build_id_with_quotes() {
        let dir = tempdir().unwrap();
        let overrides = EnvOverrides {
            workspace: Some(dir.path().to_path_buf()),
            build_id: Some("4\"2".to_string()),
            ..Default::default()
        };
        assert!(BuildEnv::from_lookup(overrides, |_| None).is_err());
    }

    #[test]
    fn missing_workspace_dir_is_rejected() {
        let overrides = EnvOverrides {
            workspace: Some(PathBuf::from("/nonexistent/workspace/xyz")),
            ..Default::default()
        };
        let err = BuildEnv::from_lookup(overrides, |_| None).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }

    #[test]
    fn require_toolchain_checks_directory() {
        let dir = tempdir().unwrap();
        let mut env = BuildEnv::from_lookup(
            EnvOverrides {
                workspace: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            |_| None,
        )
        .unwrap();
        assert!(env.require_toolchain().is_err());

        env.toolchain_dir = Some(dir.path().to_path_buf());
        assert_eq!(env.require_toolchain().unwrap(), dir.path());
    }
}
