use clap::{Parser, Subcommand};

mod commands;
mod output;
mod tty;

use commands::{latest, plan, run, stamp};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "pluginpack")]
#[command(version = VERSION)]
#[command(about = "Stamp, compile, package and publish AMX Mod X plugins")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: stamp, compile, package, publish
    Run(run::RunArgs),
    /// Stamp the build identifier into every source unit
    Stamp(stamp::StampArgs),
    /// Show resolved units, compiler invocations and package layout
    Plan(plan::PlanArgs),
    /// Print the last published version
    Latest(latest::LatestArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Run streams compile logs to stdout; only its errors use the JSON envelope.
    let exit_code = match cli.command {
        Commands::Run(args) => match run::run(args) {
            Ok(code) => code,
            Err(err) => {
                let code = output::exit_code_for_error(err.code);
                let _ = output::print_result::<serde_json::Value>(Err(err));
                code
            }
        },
        command => {
            let (json_result, exit_code) = commands::run_json(command);
            let _ = output::print_json_result(json_result);
            exit_code
        }
    };

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
