//! CLI command definitions
//!
//! Defines the clap commands for the build verifier.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run build scenarios: purge stale outputs, build, verify artifacts
    Verify {
        /// YAML scenario files, run in the order given
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the build workspace root and build-output directory
    Workspace {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove build outputs for the named artifacts
    Clean {
        /// Artifact directory names below the build-output directory
        #[arg(required = true)]
        artifacts: Vec<String>,
    },
}
