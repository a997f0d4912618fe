use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use hymc_core::{Solver, DEFAULT_Q_PARAM};

/// Prototype model checker for hybrid discrete/continuous systems.
#[derive(Parser)]
#[command(name = "hymc", version, about)]
struct Cli {
    /// Problem file to verify.
    file: PathBuf,

    /// Verbosity level (0 = warnings, 1 = info, 2 = debug, 3+ = trace).
    #[arg(short = 'v', long = "verbose", default_value_t = 1)]
    verbose: u8,

    /// Initial quantization parameter for every real variable.
    #[arg(
        short = 'q',
        long = "q_param",
        default_value_t = DEFAULT_Q_PARAM,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    q_param: u32,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage output counts as a failed run, like any argument error.
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;

    let mut solver = Solver::new();
    let elapsed = solver
        .verify(&cli.file, cli.q_param)
        .with_context(|| format!("verification of {} failed", cli.file.display()))?;
    println!("{} ms", elapsed.as_millis());
    Ok(())
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}
