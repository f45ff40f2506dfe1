//! The release pipeline: stamp → compile → verify → package → publish.
//!
//! State is carried in an explicit [`PipelineRun`] rather than accumulated in
//! shared variables. Compile failures are collected across every unit before
//! the build is judged; any other error aborts the run immediately.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::compile::{CompileRequest, Compiler, Toolchain};
use crate::env::BuildEnv;
use crate::error::{Error, Result};
use crate::manifest::{self, Manifest};
use crate::report::{BuildReport, FAILURE_MESSAGE};
use crate::source::{self, SourceUnit};
use crate::stamp::{self, StampOutcome};
use crate::utils::validation;
use crate::{ledger, package};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Init,
    Stamping,
    Compiling,
    Failed,
    Packaging,
    LedgerWrite,
    Done,
}

/// Environment, manifest and resolved units, fixed before anything runs.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub env: BuildEnv,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub units: Vec<SourceUnit>,
}

impl PipelineContext {
    /// Load the manifest (default: `<workspace>/pluginpack.json`) and resolve its units.
    pub fn load(env: BuildEnv, manifest_path: Option<&Path>) -> Result<Self> {
        let manifest_path = manifest_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| env.workspace.join(manifest::DEFAULT_MANIFEST));
        let manifest = manifest::load(&manifest_path)?;
        Self::new(env, manifest_path, manifest)
    }

    pub fn new(env: BuildEnv, manifest_path: PathBuf, manifest: Manifest) -> Result<Self> {
        let units = source::resolve_units(&env.workspace, &manifest)?;
        Ok(Self {
            env,
            manifest_path,
            manifest,
            units,
        })
    }

    pub fn toolchain(&self) -> Result<Toolchain> {
        let dir = self.env.require_toolchain()?;
        Ok(Toolchain::new(dir, self.manifest.compiler.clone()))
    }

    pub fn compile_requests(&self) -> Vec<CompileRequest> {
        self.units
            .iter()
            .filter(|u| u.compile)
            .map(|u| CompileRequest::for_unit(u, &self.env, &self.manifest))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub stage: PipelineStage,
    pub build_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub stamped: Vec<StampOutcome>,
    pub report: BuildReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<package::PackageOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<String>,
}

impl PipelineRun {
    fn new(build_id: String) -> Self {
        Self {
            stage: PipelineStage::Init,
            build_id,
            version: None,
            stamped: Vec::new(),
            report: BuildReport::new(),
            package: None,
            ledger: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.stage == PipelineStage::Done
    }

    /// 0 when done, 1 when compilation failed.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

/// Run the full pipeline. Compile logs and the failure line go to `out`.
///
/// Returns `Ok` with stage `Failed` when a unit did not compile; `Err` for
/// file-access, packaging and ledger failures.
pub fn run<W: Write>(
    ctx: &PipelineContext,
    compiler: &dyn Compiler,
    out: &mut W,
) -> Result<PipelineRun> {
    let mut run = PipelineRun::new(ctx.env.require_build_id()?.to_string());

    run.stage = PipelineStage::Stamping;
    let stamped = stamp::stamp_units(
        &ctx.units,
        &run.build_id,
        &ctx.manifest.markers,
        ctx.manifest.version_from,
    )?;
    run.version = stamped.version;
    run.stamped = stamped.units;

    run.stage = PipelineStage::Compiling;
    for request in ctx.compile_requests() {
        match compiler.compile(&request) {
            Ok(outcome) => run.report.record(outcome),
            Err(err) => {
                run.report.write_logs(out).map_err(write_error)?;
                return Err(err);
            }
        }
    }

    run.report.write_logs(out).map_err(write_error)?;

    if !run.report.success() {
        writeln!(out, "{}", FAILURE_MESSAGE).map_err(write_error)?;
        log_status!(
            "compile",
            "Failed: {}",
            run.report.failed_units().join(", ")
        );
        run.stage = PipelineStage::Failed;
        return Ok(run);
    }

    run.stage = PipelineStage::Packaging;
    let version = run.version.clone().ok_or_else(|| missing_version(&ctx.manifest))?;
    validate_version(&version)?;
    run.package = Some(package::package(&ctx.env.workspace, &ctx.manifest, &version)?);

    run.stage = PipelineStage::LedgerWrite;
    let ledger_path = ledger::write(&ctx.env.workspace, &ctx.manifest.ledger, &version)?;
    run.ledger = Some(ledger_path.to_string_lossy().to_string());

    run.stage = PipelineStage::Done;
    Ok(run)
}

fn write_error(e: std::io::Error) -> Error {
    Error::internal_io(e.to_string(), Some("write compile logs".to_string()))
}

/// The version names the archive, so it must be a single safe file-name token.
fn validate_version(version: &str) -> Result<()> {
    validation::require_token(version, "version").map_err(|_| {
        Error::config_invalid_value(
            "version",
            Some(version.to_string()),
            "Extracted version may only contain letters, digits, '.', '_', '+', '-'",
        )
        .with_hint("Fix the quoted version on the marker line in the sources")
    })?;
    Ok(())
}

fn missing_version(manifest: &Manifest) -> Error {
    let marker = match manifest.version_from {
        manifest::VersionSource::ConfigDefault => &manifest.markers.config_default,
        manifest::VersionSource::VersionDeclaration => &manifest.markers.version_declaration,
    };
    Error::config_invalid_value(
        "version_from",
        Some(marker.clone()),
        "No source unit has a quoted version on a marker line",
    )
    .with_hint(format!(
        "Add a line containing {} and a quoted version to one of the sources",
        marker
    ))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUnit {
    pub path: String,
    pub compile: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<CompileRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMapping {
    pub from: String,
    pub to: String,
    pub optional: bool,
    pub exists: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePlan {
    pub workspace: String,
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    /// Version the next run would produce, read without modifying sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub units: Vec<PlannedUnit>,
    pub staging_dir: String,
    pub archive_dir: String,
    pub ledger: String,
    pub package: Vec<PlannedMapping>,
}

/// Describe what `run` would do, without side effects.
pub fn plan(ctx: &PipelineContext) -> Result<PipelinePlan> {
    let workspace = &ctx.env.workspace;

    let version = match &ctx.env.build_id {
        Some(build_id) => preview_version(ctx, build_id)?,
        None => None,
    };

    let units = ctx
        .units
        .iter()
        .map(|unit| PlannedUnit {
            path: unit.path.to_string_lossy().to_string(),
            compile: unit.compile,
            request: unit
                .compile
                .then(|| CompileRequest::for_unit(unit, &ctx.env, &ctx.manifest)),
        })
        .collect();

    let mappings = ctx
        .manifest
        .package
        .iter()
        .map(|m| PlannedMapping {
            from: m.from.clone(),
            to: m.to.clone(),
            optional: m.optional,
            exists: workspace.join(&m.from).exists(),
        })
        .collect();

    Ok(PipelinePlan {
        workspace: workspace.to_string_lossy().to_string(),
        manifest: ctx.manifest_path.to_string_lossy().to_string(),
        build_id: ctx.env.build_id.clone(),
        version,
        units,
        staging_dir: package::staging_dir(workspace, &ctx.manifest)
            .to_string_lossy()
            .to_string(),
        archive_dir: package::archive_dir(workspace, &ctx.manifest)
            .to_string_lossy()
            .to_string(),
        ledger: ledger::ledger_path(workspace, &ctx.manifest.ledger)
            .to_string_lossy()
            .to_string(),
        package: mappings,
    })
}

fn preview_version(ctx: &PipelineContext, build_id: &str) -> Result<Option<String>> {
    for unit in &ctx.units {
        let content = std::fs::read(&unit.path).map_err(|e| {
            Error::source_access(unit.path.to_string_lossy(), "read", e.to_string())
        })?;
        let stamped = stamp::stamp_text(
            &content,
            build_id,
            &ctx.manifest.markers,
            ctx.manifest.version_from,
        );
        if stamped.version.is_some() {
            return Ok(stamped.version);
        }
    }
    Ok(None)
}
