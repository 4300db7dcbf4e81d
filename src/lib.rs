//! Build Verifier - a build-verification harness for west/ZMK firmware
//!
//! Drives an external build orchestrator, then checks that every produced
//! artifact's resolved configuration and binary match declared expectations.

pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod process;
pub mod testing;
pub mod workspace;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use engine::{Expectation, ExpectationSet};
pub use workspace::SessionContext;
