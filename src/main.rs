//! Build Verifier - drives firmware builds and checks the produced artifacts
//!
//! Runs the external builder for declarative build scenarios and asserts that
//! each artifact's resolved configuration and binary match expectations.

use std::path::PathBuf;

use build_verifier::cli::{self, GlobalOptions};
use build_verifier::commands::Commands;
use build_verifier::common::logging;
use clap::Parser;

#[derive(Parser)]
#[command(name = "build-verifier", about = "Firmware build verification harness")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to resolve the build workspace from
    #[arg(long, short = 'C', global = true)]
    dir: Option<PathBuf>,

    /// Verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let opts = GlobalOptions {
        config: cli.config,
        dir: cli.dir,
        verbose: cli.verbose,
    };

    if let Err(e) = cli::dispatch(cli.command, &opts).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
