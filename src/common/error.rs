//! Error types for the build verifier
//!
//! Messages carry enough context (command line, artifact, path) to diagnose a
//! failing run from its report alone.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the build verifier
#[derive(Error, Debug)]
pub enum Error {
    // === Workspace Errors ===
    #[error("Failed to resolve build workspace: {0}")]
    WorkspaceResolution(String),

    // === Process Errors ===
    #[error("Failed to run '{command}': {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Builder program '{0}' not found in PATH")]
    BuilderNotFound(String),

    // === Cleanup Errors ===
    #[error("Refusing to purge '{0}': artifact names must be a single path component")]
    InvalidArtifactName(String),

    #[error("Failed to purge '{path}': {source}")]
    Purge {
        path: String,
        #[source]
        source: io::Error,
    },

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario '{path}': {message}")]
    Scenario { path: String, message: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),
}

impl Error {
    /// Create a process spawn error for a rendered command line
    pub fn process_spawn(command: &str, source: io::Error) -> Self {
        Self::ProcessSpawn {
            command: command.to_string(),
            source,
        }
    }

    /// Create a purge error for a directory
    pub fn purge(path: &Path, source: io::Error) -> Self {
        Self::Purge {
            path: path.display().to_string(),
            source,
        }
    }

    /// Create a scenario error for a scenario file
    pub fn scenario(path: &Path, message: impl Into<String>) -> Self {
        Self::Scenario {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
