use clap::Args;
use serde::Serialize;

use pluginpack::stamp::{self, StampOutcome};

use super::{CmdResult, EnvArgs};

#[derive(Args)]
pub struct StampArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampOutput {
    pub command: String,
    pub build_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub units: Vec<StampOutcome>,
}

pub fn run(args: StampArgs) -> CmdResult<StampOutput> {
    let ctx = args.env.context()?;
    let build_id = ctx.env.require_build_id()?.to_string();

    let summary = stamp::stamp_units(
        &ctx.units,
        &build_id,
        &ctx.manifest.markers,
        ctx.manifest.version_from,
    )?;

    Ok((
        StampOutput {
            command: "stamp".to_string(),
            build_id,
            version: summary.version,
            units: summary.units,
        },
        0,
    ))
}
