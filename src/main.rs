use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use clover_merge::cli;

/// clover-merge — merge multiple Clover XML coverage reports into one.
#[derive(Parser)]
#[command(name = "clover-merge", version, about)]
struct Cli {
    /// Input Clover XML file paths.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output file path.
    #[arg(short, long)]
    output: PathBuf,

    /// Merge mode: additive, exclusive or inclusive.
    #[arg(short, long, default_value = "inclusive")]
    mode: String,

    /// Exit with failure if final coverage is below the given threshold.
    #[arg(short, long, default_value_t = 0.0)]
    enforce: f64,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Cli::parse();

    let outcome = cli::merge_paths(&args.paths, &args.mode, args.enforce)?;
    cli::write_output(&args.output, &outcome.xml)
        .context("Unable to write to given output file.")?;
    print!("{}", outcome.report);

    Ok(if outcome.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
