use clap::Args;

use pluginpack::pipeline::{self, PipelinePlan};

use super::{CmdResult, EnvArgs};

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

pub fn run(args: PlanArgs) -> CmdResult<PipelinePlan> {
    let ctx = args.env.context()?;
    Ok((pipeline::plan(&ctx)?, 0))
}
