use clap::Args;
use std::io::{self, Write};

use pluginpack::pipeline::{self, PipelineStage};

use super::EnvArgs;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

/// Run the full pipeline, streaming compile logs to stdout.
///
/// Returns the process exit code: 0 when published, 1 when any unit failed.
pub fn run(args: RunArgs) -> pluginpack::Result<i32> {
    let ctx = args.env.context()?;
    let toolchain = ctx.toolchain()?;

    crate::tty::status(&format!(
        "Building {} source unit(s) in {}",
        ctx.units.len(),
        ctx.env.workspace.display()
    ));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = pipeline::run(&ctx, &toolchain, &mut out)?;
    out.flush().map_err(|e| {
        pluginpack::Error::internal_io(e.to_string(), Some("write stdout".to_string()))
    })?;

    if result.stage == PipelineStage::Done {
        if let (Some(version), Some(package)) = (&result.version, &result.package) {
            crate::tty::status(&format!("Published {} ({})", version, package.archive));
        }
    } else {
        let summary = result.report.summary();
        crate::tty::status(&format!(
            "{} of {} unit(s) failed to compile",
            summary.failed, summary.total
        ));
    }

    Ok(result.exit_code())
}
