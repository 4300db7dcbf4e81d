//! CLI command handling
//!
//! Sets up the session (configuration, builder, workspace) and dispatches
//! commands to the verification engine.

use std::path::PathBuf;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::engine::{cleaner, BuildDriver};
use crate::process::SystemInvoker;
use crate::testing::{Harness, Outcome};
use crate::workspace::SessionContext;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Directory to resolve the workspace from (default: current directory)
    pub dir: Option<PathBuf>,
    /// Echo builder output
    pub verbose: bool,
}

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, opts: &GlobalOptions) -> Result<()> {
    let config = Config::load(opts.config.as_deref())?;
    let program = config.builder.resolve_program()?;
    let invoker = SystemInvoker;
    let driver = BuildDriver::new(&invoker, program, &config.builder);

    let cwd = match &opts.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    // Fatal for the whole session: nothing can be located without it
    let session = SessionContext::locate(&driver, &config.layout, &cwd).await?;

    match command {
        Commands::Verify { paths, json } => {
            let harness = Harness::new(&session, &driver, &config.layout)
                .verbose(opts.verbose)
                .quiet(json);
            let summary = harness.run_suite(&paths).await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "workspace": session.workspace_root(),
                        "build_dir": session.build_dir(),
                        "passed": summary.passed(),
                        "failed": summary.failed(),
                        "skipped": summary.skipped(),
                        "results": summary.results,
                    }))?
                );
            } else {
                for result in &summary.results {
                    if let Outcome::Skipped { reason } = &result.outcome {
                        println!("{} {} ({})", "skipped:".yellow(), result.name, reason);
                    }
                }
            }

            if summary.success() {
                Ok(())
            } else {
                Err(Error::TestAssertion(format!(
                    "{} of {} scenarios failed",
                    summary.failed(),
                    summary.results.len()
                )))
            }
        }

        Commands::Workspace { json } => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "workspace": session.workspace_root(),
                        "build_dir": session.build_dir(),
                    })
                );
            } else {
                println!("Workspace: {}", session.workspace_root().display());
                println!("Build dir: {}", session.build_dir().display());
            }
            Ok(())
        }

        Commands::Clean { artifacts } => {
            let removed = cleaner::purge(session.build_dir(), &artifacts).await?;
            if removed.is_empty() {
                println!("Nothing to remove");
            } else {
                for dir in &removed {
                    println!("Removed {}", dir.display());
                }
            }
            Ok(())
        }
    }
}
