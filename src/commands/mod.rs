use clap::Args;
use std::path::PathBuf;

use pluginpack::env::{BuildEnv, EnvOverrides};
use pluginpack::pipeline::PipelineContext;

pub type CmdResult<T> = pluginpack::Result<(T, i32)>;

/// Workspace and toolchain location, shared by every command.
///
/// Each flag overrides the matching environment variable.
#[derive(Args, Default, Debug, Clone)]
pub struct EnvArgs {
    /// Workspace root [env: WORKSPACE, default: current directory]
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Manifest file [default: <workspace>/pluginpack.json]
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Build identifier substituted for the placeholder [env: MERCURIAL_REVISION_NUMBER]
    #[arg(long, value_name = "ID")]
    pub build_id: Option<String>,

    /// Compiler toolchain directory [env: AMXXRELEASE]
    #[arg(long, value_name = "DIR")]
    pub toolchain: Option<PathBuf>,

    /// Shared include directory [env: AMXXINCLUDES]
    #[arg(long, value_name = "DIR")]
    pub includes: Option<PathBuf>,
}

impl EnvArgs {
    pub fn resolve(&self) -> pluginpack::Result<BuildEnv> {
        BuildEnv::resolve(EnvOverrides {
            workspace: self.workspace.clone(),
            build_id: self.build_id.clone(),
            toolchain: self.toolchain.clone(),
            shared_includes: self.includes.clone(),
        })
    }

    pub fn context(&self) -> pluginpack::Result<PipelineContext> {
        PipelineContext::load(self.resolve()?, self.manifest.as_deref())
    }
}

pub mod latest;
pub mod plan;
pub mod run;
pub mod stamp;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args))
    };
}

pub(crate) fn run_json(command: crate::Commands) -> (pluginpack::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Stamp(args) => dispatch!(args, stamp),
        crate::Commands::Plan(args) => dispatch!(args, plan),
        crate::Commands::Latest(args) => dispatch!(args, latest),

        // Run streams compile logs and uses raw output mode
        crate::Commands::Run(_) => {
            let err = pluginpack::Error::validation_invalid_argument(
                "output_mode",
                "Run command uses raw output mode",
                None,
                None,
            );
            crate::output::map_cmd_result_to_json::<serde_json::Value>(Err(err))
        }
    }
}
