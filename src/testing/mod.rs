//! Scenario runner
//!
//! Reads YAML build scenarios and runs each one through the verification
//! engine: purge stale outputs, invoke the builder, check the artifacts.

mod config;
mod runner;

pub use config::*;
pub use runner::{Harness, Outcome, SuiteSummary, TestResult};
