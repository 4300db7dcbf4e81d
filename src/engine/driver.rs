//! Builder invocation
//!
//! Translates build and test-matrix requests into builder command lines and
//! runs them once each. The raw process result is handed back; deciding
//! whether a nonzero exit fails the scenario is the caller's job.

use std::path::{Path, PathBuf};

use crate::common::config::BuilderConfig;
use crate::common::Result;
use crate::process::{Invocation, Invoker, ProcessOutput};

/// Flags that select the builder's pristine policy
const PRISTINE_FLAGS: &[&str] = &["-p", "--pristine"];

/// A request to build named configurations
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Configuration source directory
    pub config: PathBuf,
    /// Module search paths passed with `-m`
    pub modules: Vec<PathBuf>,
    /// Extra builder flags, e.g. `-q`
    pub flags: Vec<String>,
    /// Directory the builder runs in
    pub working_dir: PathBuf,
}

/// A request to run the builder's full test-configuration matrix
#[derive(Debug, Clone)]
pub struct MatrixRequest {
    /// Directory holding the test configurations
    pub tests: PathBuf,
    /// Module search paths passed with `-m`
    pub modules: Vec<PathBuf>,
    /// Directory the builder runs in
    pub working_dir: PathBuf,
}

/// Drives the external builder
pub struct BuildDriver<'a> {
    invoker: &'a dyn Invoker,
    program: PathBuf,
    builder: &'a BuilderConfig,
}

impl<'a> BuildDriver<'a> {
    pub fn new(invoker: &'a dyn Invoker, program: PathBuf, builder: &'a BuilderConfig) -> Self {
        Self {
            invoker,
            program,
            builder,
        }
    }

    pub fn builder(&self) -> &BuilderConfig {
        self.builder
    }

    fn invocation(&self, working_dir: &Path) -> Invocation {
        Invocation::new(&self.program, working_dir)
            .args(self.builder.program_args.iter().cloned())
    }

    /// Ask the builder for its workspace root
    pub async fn query_topdir(&self, working_dir: &Path) -> Result<ProcessOutput> {
        let invocation = self.invocation(working_dir).arg(&self.builder.topdir_command);
        self.invoker.run(&invocation).await
    }

    /// Command line for a build request
    ///
    /// `-p always` is appended unless the flags already choose a pristine
    /// policy, so every artifact starts from a clean build tree.
    pub fn build_invocation(&self, request: &BuildRequest) -> Invocation {
        let mut invocation = self
            .invocation(&request.working_dir)
            .arg(&self.builder.build_command)
            .arg(path_arg(&request.config));

        if !request.modules.is_empty() {
            invocation = invocation
                .arg("-m")
                .args(request.modules.iter().map(|m| path_arg(m)));
        }

        invocation = invocation.args(request.flags.iter().cloned());

        let has_pristine = request
            .flags
            .iter()
            .any(|f| {
                PRISTINE_FLAGS.contains(&f.as_str())
                    || f.starts_with("--pristine=")
                    // Attached short form, e.g. `-pauto`
                    || (f.len() > 2 && f.starts_with("-p"))
            });
        if !has_pristine {
            invocation = invocation.args(["-p", "always"]);
        }

        invocation
    }

    /// Command line for a test-matrix request
    pub fn matrix_invocation(&self, request: &MatrixRequest) -> Invocation {
        let mut invocation = self
            .invocation(&request.working_dir)
            .arg(&self.builder.test_command)
            .arg(path_arg(&request.tests));

        if !request.modules.is_empty() {
            invocation = invocation
                .arg("-m")
                .args(request.modules.iter().map(|m| path_arg(m)));
        }

        invocation.arg("-v")
    }

    /// Build named configurations
    pub async fn build(&self, request: &BuildRequest) -> Result<ProcessOutput> {
        let invocation = self.build_invocation(request);
        tracing::info!("Building: {}", invocation);
        self.invoker.run(&invocation).await
    }

    /// Run the full test-configuration matrix
    pub async fn run_matrix(&self, request: &MatrixRequest) -> Result<ProcessOutput> {
        let invocation = self.matrix_invocation(request);
        tracing::info!("Running test matrix: {}", invocation);
        self.invoker.run(&invocation).await
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
