//! Command execution primitives with consistent error handling.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;

/// Exit status of a process whose combined output went to a log file.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedRun {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Run a program in `dir`, appending its stdout and stderr to `log_path`.
///
/// Both streams share one file handle so their interleaving matches what a
/// shell `>> log 2>&1` redirect would produce. Blocks until the process exits.
pub fn run_to_log(
    program: &Path,
    args: &[String],
    dir: &Path,
    log_path: &Path,
) -> std::io::Result<LoggedRun> {
    let log = File::options().create(true).append(true).open(log_path)?;
    let log_err = log.try_clone()?;

    let status = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .status()?;

    Ok(LoggedRun {
        exit_code: status.code(),
    })
}
