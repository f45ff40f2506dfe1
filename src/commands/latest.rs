use clap::Args;
use serde::Serialize;

use pluginpack::ledger;
use pluginpack::manifest;

use super::{CmdResult, EnvArgs};

#[derive(Args)]
pub struct LatestArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestOutput {
    pub ledger: String,
    /// `None` when no release has been published yet.
    pub version: Option<String>,
}

pub fn run(args: LatestArgs) -> CmdResult<LatestOutput> {
    let env = args.env.resolve()?;
    let manifest_path = args
        .env
        .manifest
        .clone()
        .unwrap_or_else(|| env.workspace.join(manifest::DEFAULT_MANIFEST));
    let manifest = manifest::load(&manifest_path)?;

    let version = ledger::read(&env.workspace, &manifest.ledger)?;
    let path = ledger::ledger_path(&env.workspace, &manifest.ledger);

    Ok((
        LatestOutput {
            ledger: path.to_string_lossy().to_string(),
            version,
        },
        0,
    ))
}
