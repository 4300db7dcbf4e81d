//! Artifact verification
//!
//! Checks the filesystem state a build left behind against an
//! [`ExpectationSet`]. For every artifact, in declaration order:
//!
//! 1. `<build>/<artifact>/<toolchain>/<config_name>` must exist
//! 2. every expectation entry must hold against its text
//! 3. `<build>/<artifact>/<toolchain>/<binary_name>` must exist
//!
//! Failures are collected rather than stopping at the first one, so a single
//! run reports every violated entry. The binary is checked even when the
//! configuration file is missing.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::expectation::{Expectation, ExpectationSet};
use crate::common::config::LayoutConfig;

/// Output locations of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    /// Directory holding the configuration file and binary
    pub dir: PathBuf,
    pub config: PathBuf,
    pub binary: PathBuf,
}

impl ArtifactPaths {
    pub fn derive(build_dir: &Path, layout: &LayoutConfig, artifact: &str) -> Self {
        let dir = build_dir.join(artifact).join(&layout.toolchain_subdir);
        Self {
            config: dir.join(&layout.config_name),
            binary: dir.join(&layout.binary_name),
            dir,
        }
    }
}

/// A single failed check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingConfig {
        artifact: String,
        path: PathBuf,
    },
    UnreadableConfig {
        artifact: String,
        path: PathBuf,
        error: String,
    },
    MissingText {
        artifact: String,
        text: String,
        path: PathBuf,
    },
    ForbiddenText {
        artifact: String,
        text: String,
        path: PathBuf,
    },
    MissingBinary {
        artifact: String,
        path: PathBuf,
    },
    UnreadableBinary {
        artifact: String,
        path: PathBuf,
        error: String,
    },
}

impl Violation {
    pub fn artifact(&self) -> &str {
        match self {
            Self::MissingConfig { artifact, .. }
            | Self::UnreadableConfig { artifact, .. }
            | Self::MissingText { artifact, .. }
            | Self::ForbiddenText { artifact, .. }
            | Self::MissingBinary { artifact, .. }
            | Self::UnreadableBinary { artifact, .. } => artifact,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingConfig { artifact, path } => {
                write!(f, "{} is missing for {}", path.display(), artifact)
            }
            Self::UnreadableConfig {
                artifact,
                path,
                error,
            } => write!(f, "{} could not be read for {}: {}", path.display(), artifact, error),
            Self::MissingText {
                artifact,
                text,
                path,
            } => write!(f, "{} not found in {} for {}", text, path.display(), artifact),
            Self::ForbiddenText {
                artifact,
                text,
                path,
            } => write!(
                f,
                "{} found in {} for {}, but it should not be present",
                text,
                path.display(),
                artifact
            ),
            Self::MissingBinary { artifact, path } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = path.parent().unwrap_or(path);
                write!(f, "{} {} is missing in {}", artifact, name, dir.display())
            }
            Self::UnreadableBinary {
                artifact,
                path,
                error,
            } => write!(f, "{} could not be checked for {}: {}", path.display(), artifact, error),
        }
    }
}

/// Verification outcome for one artifact
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReport {
    pub name: String,
    pub paths: ArtifactPaths,
    /// Expectation entries that were evaluated against the configuration
    pub entries_checked: usize,
    pub violations: Vec<Violation>,
}

impl ArtifactReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Verification outcome for a whole expectation set
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub artifacts: Vec<ArtifactReport>,
}

impl VerificationReport {
    pub fn passed(&self) -> bool {
        self.artifacts.iter().all(ArtifactReport::passed)
    }

    /// Every violation, in artifact then entry order
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.artifacts.iter().flat_map(|a| a.violations.iter())
    }
}

/// Verify every artifact of `expectations` below `build_dir`
pub async fn verify(
    build_dir: &Path,
    layout: &LayoutConfig,
    expectations: &ExpectationSet,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    for artifact in expectations {
        let paths = ArtifactPaths::derive(build_dir, layout, &artifact.name);
        let artifact_report = verify_artifact(&artifact.name, paths, &artifact.expect).await;
        tracing::debug!(
            artifact = %artifact_report.name,
            violations = artifact_report.violations.len(),
            "Verified artifact"
        );
        report.artifacts.push(artifact_report);
    }
    report
}

async fn verify_artifact(
    name: &str,
    paths: ArtifactPaths,
    entries: &[Expectation],
) -> ArtifactReport {
    let mut violations = Vec::new();
    let mut entries_checked = 0;

    match tokio::fs::read(&paths.config).await {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            for entry in entries {
                entries_checked += 1;
                if entry.holds_for(&content) {
                    continue;
                }
                violations.push(match entry {
                    Expectation::MustContain(text) => Violation::MissingText {
                        artifact: name.to_string(),
                        text: text.clone(),
                        path: paths.config.clone(),
                    },
                    Expectation::MustNotContain(text) => Violation::ForbiddenText {
                        artifact: name.to_string(),
                        text: text.clone(),
                        path: paths.config.clone(),
                    },
                });
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            violations.push(Violation::MissingConfig {
                artifact: name.to_string(),
                path: paths.config.clone(),
            });
        }
        Err(e) => {
            violations.push(Violation::UnreadableConfig {
                artifact: name.to_string(),
                path: paths.config.clone(),
                error: e.to_string(),
            });
        }
    }

    match tokio::fs::try_exists(&paths.binary).await {
        Ok(true) => {}
        Ok(false) => violations.push(Violation::MissingBinary {
            artifact: name.to_string(),
            path: paths.binary.clone(),
        }),
        Err(e) => violations.push(Violation::UnreadableBinary {
            artifact: name.to_string(),
            path: paths.binary.clone(),
            error: e.to_string(),
        }),
    }

    ArtifactReport {
        name: name.to_string(),
        paths,
        entries_checked,
        violations,
    }
}
