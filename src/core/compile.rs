//! Out-of-process compilation of source units.
//!
//! Success is decided by one thing only: whether the artifact exists after the
//! compiler returns. The exit code is recorded but not consulted, so a compiler
//! that crashes after writing a partial artifact still counts as a success.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::env::BuildEnv;
use crate::error::Result;
use crate::manifest::Manifest;
use crate::source::SourceUnit;
use crate::utils::{command, io};

/// Everything needed to compile one unit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    pub unit: String,
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub include_dirs: Vec<PathBuf>,
    pub log_path: PathBuf,
}

impl CompileRequest {
    pub fn for_unit(unit: &SourceUnit, env: &BuildEnv, manifest: &Manifest) -> Self {
        Self {
            unit: unit.display_name(),
            source: unit.path.clone(),
            artifact: unit.artifact_path(manifest),
            include_dirs: unit.include_dirs(env, manifest),
            log_path: unit.log_path(),
        }
    }

    /// `<source> -o<artifact> -i<include>...`
    pub fn compiler_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.include_dirs.len() + 2);
        args.push(self.source.to_string_lossy().to_string());
        args.push(format!("-o{}", self.artifact.to_string_lossy()));
        for dir in &self.include_dirs {
            args.push(format!("-i{}", dir.to_string_lossy()));
        }
        args
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutcome {
    pub unit: String,
    pub artifact: String,
    pub success: bool,
    /// Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub log: String,
}

/// Something that turns a compile request into an outcome.
///
/// A unit that cannot be built yields `Ok` with `success: false`. `Err` aborts
/// the whole pipeline and is reserved for failures outside any single unit.
pub trait Compiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome>;
}

/// The external toolchain: `<dir>/<binary>`, run from `<dir>`.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub dir: PathBuf,
    pub binary: String,
}

impl Toolchain {
    pub fn new(dir: impl Into<PathBuf>, binary: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            binary: binary.into(),
        }
    }

    pub fn program(&self) -> PathBuf {
        self.dir.join(&self.binary)
    }
}

impl Compiler for Toolchain {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome> {
        let program = self.program();
        log_status!("compile", "{} -> {}", request.unit, request.artifact.display());

        // Problems around the invocation fail this unit only; their text joins its log.
        let mut notes = String::new();
        let prepared = match prepare_artifact_location(&request.artifact) {
            Ok(()) => true,
            Err(e) => {
                notes.push_str(&format!("{}\n", e));
                false
            }
        };

        let mut exit_code = None;
        if prepared {
            let args = request.compiler_args();
            match command::run_to_log(&program, &args, &self.dir, &request.log_path) {
                Ok(run) => exit_code = run.exit_code,
                Err(e) => {
                    notes.push_str(&format!("Failed to start {}: {}\n", program.display(), e));
                }
            }
        }

        let mut log_text = match take_log(&request.log_path) {
            Ok(text) => text,
            Err(e) => format!("{}\n", e),
        };
        log_text.push_str(&notes);

        let success = prepared && request.artifact.is_file();
        if !success {
            log_status!("compile", "{}: no artifact produced", request.unit);
        }

        Ok(CompileOutcome {
            unit: request.unit.clone(),
            artifact: request.artifact.to_string_lossy().to_string(),
            success,
            exit_code,
            log: log_text,
        })
    }
}

/// Ensure the artifact directory exists and drop any artifact from a previous run.
fn prepare_artifact_location(artifact: &Path) -> std::result::Result<(), String> {
    if let Some(parent) = artifact.parent() {
        io::ensure_dir(parent).map_err(|e| {
            format!("Cannot create artifact directory {}: {}", parent.display(), e)
        })?;
    }
    io::remove_file_if_exists(artifact)
        .map_err(|e| format!("Cannot remove stale artifact {}: {}", artifact.display(), e))
}

/// Read the transient log file and delete it. A missing log reads as empty.
fn take_log(log_path: &Path) -> std::result::Result<String, String> {
    let text = match fs::read(log_path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(format!("Cannot read compile log {}: {}", log_path.display(), e)),
    };
    io::remove_file_if_exists(log_path)
        .map_err(|e| format!("Cannot delete compile log {}: {}", log_path.display(), e))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn request(dir: &Path) -> CompileRequest {
        CompileRequest {
            unit: "test.sma".to_string(),
            source: dir.join("test.sma"),
            artifact: dir.join("plugins/test.amxx"),
            include_dirs: vec![dir.join("include"), PathBuf::from("/opt/inc")],
            log_path: dir.join("test.txt"),
        }
    }

    #[test]
    fn compiler_args_follow_amxxpc_syntax() {
        let req = request(Path::new("/ws"));
        assert_eq!(
            req.compiler_args(),
            vec![
                "/ws/test.sma".to_string(),
                "-o/ws/plugins/test.amxx".to_string(),
                "-i/ws/include".to_string(),
                "-i/opt/inc".to_string(),
            ]
        );
    }

    #[test]
    fn missing_compiler_is_a_unit_failure() {
        let dir = tempdir().unwrap();
        let toolchain = Toolchain::new(dir.path(), "amxxpc-missing");
        let req = request(dir.path());

        let outcome = toolchain.compile(&req).unwrap();

        assert!(!outcome.success);
        assert!(outcome.log.contains("Failed to start"));
        assert!(!req.log_path.exists());
        assert!(dir.path().join("plugins").is_dir());
    }

    #[test]
    fn blocked_artifact_directory_is_a_unit_failure() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("plugins"), "not a directory").unwrap();
        let toolchain = Toolchain::new(dir.path(), "amxxpc-missing");
        let req = request(dir.path());

        let outcome = toolchain.compile(&req).unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.log.contains("Cannot create artifact directory"));
        assert!(!outcome.log.contains("Failed to start"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_compiler(dir: &Path, body: &str) -> Toolchain {
            let path = dir.join("amxxpc");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            Toolchain::new(dir, "amxxpc")
        }

        #[test]
        fn artifact_presence_means_success() {
            let dir = tempdir().unwrap();
            let toolchain = fake_compiler(
                dir.path(),
                r#"out=""; for a in "$@"; do case "$a" in -o*) out="${a#-o}";; esac; done
echo "Compiling $1"; echo "warning 217" 1>&2; printf 'bin' > "$out""#,
            );
            let req = request(dir.path());

            let outcome = toolchain.compile(&req).unwrap();

            assert!(outcome.success);
            assert_eq!(outcome.exit_code, Some(0));
            assert!(outcome.log.contains("Compiling"));
            assert!(outcome.log.contains("warning 217"));
            assert!(!req.log_path.exists(), "transient log must be deleted");
        }

        #[test]
        fn exit_code_is_not_consulted() {
            let dir = tempdir().unwrap();
            let toolchain = fake_compiler(
                dir.path(),
                r#"for a in "$@"; do case "$a" in -o*) printf 'partial' > "${a#-o}";; esac; done
exit 139"#,
            );

            let outcome = toolchain.compile(&request(dir.path())).unwrap();

            assert!(outcome.success);
            assert_eq!(outcome.exit_code, Some(139));
        }

        #[test]
        fn clean_exit_without_artifact_is_failure() {
            let dir = tempdir().unwrap();
            let toolchain = fake_compiler(dir.path(), "echo 'error 017: undefined symbol'");

            let outcome = toolchain.compile(&request(dir.path())).unwrap();

            assert!(!outcome.success);
            assert_eq!(outcome.exit_code, Some(0));
            assert!(outcome.log.contains("error 017"));
        }

        #[test]
        fn stale_artifact_does_not_count() {
            let dir = tempdir().unwrap();
            let req = request(dir.path());
            fs::create_dir_all(dir.path().join("plugins")).unwrap();
            fs::write(&req.artifact, "from last build").unwrap();
            let toolchain = fake_compiler(dir.path(), "exit 1");

            let outcome = toolchain.compile(&req).unwrap();

            assert!(!outcome.success);
            assert!(!req.artifact.exists());
        }
    }
}
