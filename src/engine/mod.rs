//! Artifact verification engine
//!
//! Cleans stale outputs, drives the external builder and checks what it
//! produced against declarative expectations.

pub mod cleaner;
pub mod driver;
pub mod expectation;
pub mod verifier;

pub use driver::{BuildDriver, BuildRequest, MatrixRequest};
pub use expectation::{ArtifactExpectation, Expectation, ExpectationSet};
pub use verifier::{verify, ArtifactPaths, ArtifactReport, VerificationReport, Violation};
