//! Build workspace location
//!
//! The workspace root is asked of the builder once per session; everything
//! else is derived from it.

use std::path::{Path, PathBuf};

use crate::common::config::LayoutConfig;
use crate::common::{Error, Result};
use crate::engine::driver::BuildDriver;
use crate::engine::verifier::ArtifactPaths;

/// Paths shared by every scenario of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    workspace_root: PathBuf,
    build_dir: PathBuf,
}

impl SessionContext {
    /// Build a context from a known workspace root
    pub fn new(workspace_root: impl Into<PathBuf>, layout: &LayoutConfig) -> Self {
        let workspace_root = workspace_root.into();
        let build_dir = workspace_root.join(&layout.build_subdir);
        Self {
            workspace_root,
            build_dir,
        }
    }

    /// Query the builder for the workspace root
    ///
    /// Any failure here is fatal for the session: without the root no
    /// artifact can be located.
    pub async fn locate(
        driver: &BuildDriver<'_>,
        layout: &LayoutConfig,
        working_dir: &Path,
    ) -> Result<Self> {
        let output = driver.query_topdir(working_dir).await.map_err(|e| {
            Error::WorkspaceResolution(format!(
                "could not run '{}': {}",
                driver.builder().topdir_command,
                e
            ))
        })?;

        if !output.success() {
            return Err(Error::WorkspaceResolution(format!(
                "'{}' failed with {}:\n{}",
                driver.builder().topdir_command,
                output.status_label(),
                output.combined()
            )));
        }

        let reported = output.stdout.trim();
        if reported.is_empty() {
            return Err(Error::WorkspaceResolution(format!(
                "'{}' printed no path",
                driver.builder().topdir_command
            )));
        }

        let root = PathBuf::from(reported);
        let root = if root.is_relative() {
            working_dir.join(root)
        } else {
            root
        };
        if !root.is_dir() {
            return Err(Error::WorkspaceResolution(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        let context = Self::new(root, layout);
        tracing::info!(
            workspace = %context.workspace_root.display(),
            build_dir = %context.build_dir.display(),
            "Located build workspace"
        );
        Ok(context)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Derived output paths for one artifact
    pub fn artifact_paths(&self, layout: &LayoutConfig, artifact: &str) -> ArtifactPaths {
        ArtifactPaths::derive(&self.build_dir, layout, artifact)
    }
}
