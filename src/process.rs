//! External process invocation
//!
//! Runs one command to completion and captures its exit code and both output
//! streams. A nonzero exit is an ordinary result; only failing to start the
//! process is an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use crate::common::{Error, Result};

/// A command line bound to a working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name without its directory, for compact messages
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program_name())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, unmodified
    pub fn combined(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }

    /// Human-readable exit status
    pub fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        }
    }
}

/// Runs invocations
///
/// The seam exists so the driver and locator can be exercised against a
/// scripted builder.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Invoker that spawns real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInvoker;

#[async_trait]
impl Invoker for SystemInvoker {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        tracing::debug!(cwd = %invocation.working_dir.display(), "Running {}", invocation);

        let output = TokioCommand::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::process_spawn(&invocation.to_string(), e))?;

        let result = ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            code = ?result.code,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "{} finished",
            invocation.program_name()
        );

        Ok(result)
    }
}

/// Run a single command with the system invoker
pub async fn run(program: &Path, args: &[&str], working_dir: &Path) -> Result<ProcessOutput> {
    let invocation = Invocation::new(program, working_dir).args(args.iter().copied());
    SystemInvoker.run(&invocation).await
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_quotes_spaced_args() {
        let inv = Invocation::new("/usr/bin/west", "/tmp")
            .arg("zmk-build")
            .args(["my config", "-q"]);
        assert_eq!(inv.to_string(), "west zmk-build \"my config\" -q");
    }

    #[test]
    fn test_combined_output_keeps_both_streams_verbatim() {
        let out = mock::exited(2, "building...\n", "error: missing board\n");
        assert!(!out.success());
        assert_eq!(out.combined(), "building...\nerror: missing board\n");
        assert_eq!(out.status_label(), "exit code 2");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_a_result_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = run(
            Path::new("sh"),
            &["-c", "echo out; echo err >&2; exit 3"],
            dir.path(),
        )
        .await
        .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let out = run(Path::new("cat"), &["marker.txt"], dir.path()).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "here");
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(Path::new("/nonexistent/builder"), &["topdir"], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProcessSpawn { .. }));
        assert!(err.to_string().contains("builder topdir"));
    }
}
