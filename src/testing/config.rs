//! Scenario file types
//!
//! Defines the data structures for deserializing YAML build scenarios.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::engine::cleaner;
use crate::engine::ExpectationSet;

/// Host operating systems a scenario can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    #[serde(alias = "darwin")]
    MacOS,
    Windows,
}

impl Platform {
    /// Get the current platform, if it is one of the known ones
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::MacOS),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::MacOS => write!(f, "macos"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

/// A complete build scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct TestScenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Run only on this host OS; other hosts report a skip
    pub only_on: Option<Platform>,
    /// Reason shown when the scenario is skipped
    pub skip_reason: Option<String>,
    /// Directory the builder runs in, relative to the scenario file
    pub working_dir: Option<PathBuf>,
    /// What to run and what to expect
    #[serde(flatten)]
    pub kind: ScenarioKind,
}

/// The two ways a scenario drives the builder
#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Build named configurations and verify the produced artifacts
    Build {
        /// Configuration source directory
        config: PathBuf,
        /// Module search paths
        #[serde(default)]
        modules: Vec<PathBuf>,
        /// Builder flags; the configured defaults apply when absent
        flags: Option<Vec<String>>,
        /// Extra build-output subdirectories to purge before building
        #[serde(default)]
        clean: Vec<String>,
        /// Expected artifacts and their configuration entries
        artifacts: ExpectationSet,
    },
    /// Run the builder's full test-configuration matrix
    Matrix {
        /// Directory holding the test configurations
        tests: PathBuf,
        /// Module search paths
        #[serde(default)]
        modules: Vec<PathBuf>,
        /// Build-output subdirectories to purge before running
        #[serde(default)]
        clean: Vec<String>,
        /// Text that must appear in the builder's stdout
        #[serde(default)]
        expect_stdout: Vec<String>,
    },
}

impl TestScenario {
    /// Load and validate a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        let scenario: TestScenario =
            serde_yaml::from_str(&content).map_err(|e| Error::scenario(path, e.to_string()))?;
        scenario.validate(path)?;
        Ok(scenario)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::scenario(path, "scenario name is empty"));
        }

        let clean = match &self.kind {
            ScenarioKind::Build {
                artifacts, clean, ..
            } => {
                if artifacts.is_empty() {
                    return Err(Error::scenario(path, "build scenario lists no artifacts"));
                }
                if let Some(name) = artifacts.duplicate_name() {
                    return Err(Error::scenario(
                        path,
                        format!("artifact '{}' is listed more than once", name),
                    ));
                }
                for name in artifacts.names() {
                    cleaner::validate_name(name).map_err(|e| Error::scenario(path, e.to_string()))?;
                }
                clean
            }
            ScenarioKind::Matrix { clean, .. } => clean,
        };

        for name in clean {
            cleaner::validate_name(name).map_err(|e| Error::scenario(path, e.to_string()))?;
        }
        Ok(())
    }

    /// Directory the builder runs in
    ///
    /// Relative paths are resolved against the scenario file's directory.
    pub fn resolve_working_dir(&self, scenario_path: &Path) -> PathBuf {
        let scenario_dir = scenario_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => scenario_dir.join(dir),
            None => scenario_dir.to_path_buf(),
        }
    }

    /// Why this scenario should not run on `host`, if it shouldn't
    pub fn skip_reason_on(&self, host: Option<Platform>) -> Option<String> {
        let required = self.only_on?;
        if host == Some(required) {
            return None;
        }
        Some(
            self.skip_reason
                .clone()
                .unwrap_or_else(|| format!("{} is only supported on {}", self.name, required)),
        )
    }
}
