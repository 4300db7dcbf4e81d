//! Scenario runner
//!
//! Executes scenarios in the fixed order clean → build → verify, one at a
//! time, and turns every failure into a readable entry of the result.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::common::config::LayoutConfig;
use crate::common::Result;
use crate::engine::{
    cleaner, verify, BuildDriver, BuildRequest, ExpectationSet, MatrixRequest, VerificationReport,
};
use crate::process::{Invocation, ProcessOutput};
use crate::workspace::SessionContext;

use super::config::{Platform, ScenarioKind, TestScenario};

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped { reason: String },
}

/// Result of a scenario run
#[derive(Debug, Serialize)]
pub struct TestResult {
    pub name: String,
    pub path: PathBuf,
    pub outcome: Outcome,
    /// Human-readable failure messages, in the order they were found
    pub failures: Vec<String>,
    /// Per-artifact details for build scenarios that reached verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationReport>,
}

impl TestResult {
    fn passed(name: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            outcome: Outcome::Passed,
            failures: Vec::new(),
            verification: None,
        }
    }

    fn failed(name: &str, path: &Path, failures: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            outcome: Outcome::Failed,
            failures,
            verification: None,
        }
    }

    fn skipped(name: &str, path: &Path, reason: String) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            outcome: Outcome::Skipped { reason },
            failures: Vec::new(),
            verification: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Results of a run over several scenario files
#[derive(Debug, Default, Serialize)]
pub struct SuiteSummary {
    pub results: Vec<TestResult>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    /// Skips count as neither pass nor fail
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Everything a scenario needs from the session
pub struct Harness<'a> {
    session: &'a SessionContext,
    driver: &'a BuildDriver<'a>,
    layout: &'a LayoutConfig,
    host: Option<Platform>,
    verbose: bool,
    quiet: bool,
}

impl<'a> Harness<'a> {
    pub fn new(
        session: &'a SessionContext,
        driver: &'a BuildDriver<'a>,
        layout: &'a LayoutConfig,
    ) -> Self {
        Self {
            session,
            driver,
            layout,
            host: Platform::current(),
            verbose: false,
            quiet: false,
        }
    }

    /// Echo builder output and command lines
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Suppress the human-readable progress report
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Pretend to run on a different host
    pub fn host(mut self, host: Option<Platform>) -> Self {
        self.host = host;
        self
    }

    fn say(&self, line: impl Display) {
        if !self.quiet {
            println!("{}", line);
        }
    }

    /// Run every scenario file in order
    ///
    /// A scenario file that cannot be loaded is recorded as a failure and the
    /// remaining files still run.
    pub async fn run_suite(&self, paths: &[PathBuf]) -> SuiteSummary {
        let mut summary = SuiteSummary::default();
        for path in paths {
            let result = match self.run_scenario(path).await {
                Ok(result) => result,
                Err(e) => {
                    self.say(format!("\n{} {}: {}", "✗".red(), path.display(), e));
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    TestResult::failed(&name, path, vec![e.to_string()])
                }
            };
            summary.results.push(result);
        }

        self.say(format!(
            "\n{} {} passed, {} failed, {} skipped",
            "Summary:".blue().bold(),
            summary.passed().to_string().green(),
            summary.failed().to_string().red(),
            summary.skipped().to_string().yellow()
        ));

        summary
    }

    /// Run a scenario from a YAML file
    pub async fn run_scenario(&self, path: &Path) -> Result<TestResult> {
        let scenario = TestScenario::load(path)?;

        self.say(format!(
            "\n{} {}",
            "Running Scenario:".blue().bold(),
            scenario.name.white().bold()
        ));
        if let Some(desc) = &scenario.description {
            self.say(format!("  {}", desc.dimmed()));
        }

        if let Some(reason) = scenario.skip_reason_on(self.host) {
            tracing::warn!(scenario = %scenario.name, "Skipping: {}", reason);
            self.say(format!("  {} {}", "SKIPPED".yellow().bold(), reason));
            return Ok(TestResult::skipped(&scenario.name, path, reason));
        }

        let working_dir = scenario.resolve_working_dir(path);
        tracing::info!(
            scenario = %scenario.name,
            cwd = %working_dir.display(),
            "Running scenario"
        );

        let result = match &scenario.kind {
            ScenarioKind::Build {
                config,
                modules,
                flags,
                clean,
                artifacts,
            } => {
                let request = BuildRequest {
                    config: config.clone(),
                    modules: modules.clone(),
                    flags: flags
                        .clone()
                        .unwrap_or_else(|| self.driver.builder().default_build_flags.clone()),
                    working_dir,
                };
                self.run_build(&scenario.name, path, &request, clean, artifacts)
                    .await?
            }
            ScenarioKind::Matrix {
                tests,
                modules,
                clean,
                expect_stdout,
            } => {
                let request = MatrixRequest {
                    tests: tests.clone(),
                    modules: modules.clone(),
                    working_dir,
                };
                self.run_matrix(&scenario.name, path, &request, clean, expect_stdout)
                    .await?
            }
        };

        match result.outcome {
            Outcome::Passed => self.say(format!(
                "\n{} {}",
                "✓".green().bold(),
                "Scenario Passed".green().bold()
            )),
            _ => {
                // Verification failures were already listed per artifact
                if result.verification.is_none() {
                    for failure in &result.failures {
                        self.say(format!("\n{}", failure));
                    }
                }
                self.say(format!(
                    "\n{} {}",
                    "✗".red().bold(),
                    "Scenario Failed".red().bold()
                ));
            }
        }

        Ok(result)
    }

    async fn run_build(
        &self,
        name: &str,
        path: &Path,
        request: &BuildRequest,
        clean: &[String],
        artifacts: &ExpectationSet,
    ) -> Result<TestResult> {
        let to_purge: Vec<&str> = artifacts
            .names()
            .chain(clean.iter().map(String::as_str))
            .collect();
        if let Some(failure) = self.clean(&to_purge).await {
            return Ok(TestResult::failed(name, path, vec![failure]));
        }

        let invocation = self.driver.build_invocation(request);
        let output = self.driver.build(request).await?;
        if let Some(failure) = self.check_exit(&invocation, &output) {
            return Ok(TestResult::failed(name, path, vec![failure]));
        }

        self.say(format!("\n{}", "Verify:".cyan()));
        let report = verify(self.session.build_dir(), self.layout, artifacts).await;
        for artifact in &report.artifacts {
            if artifact.passed() {
                self.say(format!(
                    "  {} {} ({} entries, {})",
                    "✓".green(),
                    artifact.name,
                    artifact.entries_checked,
                    self.layout.binary_name.dimmed()
                ));
            } else {
                self.say(format!("  {} {}", "✗".red(), artifact.name));
                for violation in &artifact.violations {
                    self.say(format!("      {}", violation));
                }
            }
        }

        let failures: Vec<String> = report.violations().map(ToString::to_string).collect();
        let mut result = if failures.is_empty() {
            TestResult::passed(name, path)
        } else {
            TestResult::failed(name, path, failures)
        };
        result.verification = Some(report);
        Ok(result)
    }

    async fn run_matrix(
        &self,
        name: &str,
        path: &Path,
        request: &MatrixRequest,
        clean: &[String],
        expect_stdout: &[String],
    ) -> Result<TestResult> {
        if let Some(failure) = self.clean(clean).await {
            return Ok(TestResult::failed(name, path, vec![failure]));
        }

        let invocation = self.driver.matrix_invocation(request);
        let output = self.driver.run_matrix(request).await?;
        if let Some(failure) = self.check_exit(&invocation, &output) {
            return Ok(TestResult::failed(name, path, vec![failure]));
        }

        self.say(format!("\n{}", "Verify:".cyan()));
        let mut failures = Vec::new();
        for expected in expect_stdout {
            if output.stdout.contains(expected.as_str()) {
                self.say(format!("  {} stdout contains '{}'", "✓".green(), expected));
            } else {
                self.say(format!("  {} stdout lacks '{}'", "✗".red(), expected));
                failures.push(format!(
                    "'{}' not found in output of '{}':\n{}",
                    expected,
                    invocation,
                    output.combined()
                ));
            }
        }

        Ok(if failures.is_empty() {
            TestResult::passed(name, path)
        } else {
            TestResult::failed(name, path, failures)
        })
    }

    /// Purge stale outputs; returns a failure message if that went wrong
    async fn clean<S: AsRef<str>>(&self, names: &[S]) -> Option<String> {
        if names.is_empty() {
            return None;
        }
        self.say(format!("\n{}", "Clean:".cyan()));
        match cleaner::purge(self.session.build_dir(), names).await {
            Ok(removed) => {
                self.say(format!(
                    "  {} {} stale output director{} removed",
                    "✓".green(),
                    removed.len(),
                    if removed.len() == 1 { "y" } else { "ies" }
                ));
                None
            }
            Err(e) => {
                self.say(format!("  {} {}", "✗".red(), e));
                Some(format!("Failed to purge stale outputs: {}", e))
            }
        }
    }

    /// Report the builder run; returns a failure message carrying the full
    /// builder output on nonzero exit
    fn check_exit(&self, invocation: &Invocation, output: &ProcessOutput) -> Option<String> {
        self.say(format!("\n{}", "Build:".cyan()));
        if output.success() {
            self.say(format!("  {} {}", "✓".green(), invocation.to_string().dimmed()));
            if self.verbose && !output.stdout.is_empty() {
                self.say(output.stdout.trim_end().dimmed());
            }
            return None;
        }

        self.say(format!(
            "  {} {} ({})",
            "✗".red(),
            invocation,
            output.status_label()
        ));
        Some(format!(
            "Builder command '{}' failed with {}:\n{}",
            invocation,
            output.status_label(),
            output.combined()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::BuilderConfig;
    use crate::process::mock::{exited, MockInvoker};
    use std::fs;

    const SPLIT: &str = r##"
name: zmk-build-split
kind: build
config: split-config/config
modules: [split-config, .]
artifacts:
  - name: right
    expect:
      - must_contain: CONFIG_ZMK_STUDIO=y
      - must_contain: CONFIG_ZMK_BATTERY_HISTORY_STUDIO_RPC=y
  - name: left
    expect:
      - must_contain: "# CONFIG_ZMK_STUDIO is not set"
      - must_not_contain: CONFIG_ZMK_BATTERY_HISTORY_STUDIO_RPC
"##;

    const MATRIX: &str = r#"
name: zmk-test
kind: matrix
only_on: linux
tests: tests
modules: [.]
clean: [tests]
expect_stdout: ["PASS: battery-history"]
"#;

    /// Fake builder that writes a split keyboard's outputs into `build_dir`
    fn split_builder(build_dir: PathBuf, leak_rpc_into_left: bool) -> MockInvoker {
        MockInvoker::new(move |inv| {
            for (name, config) in [
                ("right", "CONFIG_ZMK_STUDIO=y\nCONFIG_ZMK_BATTERY_HISTORY_STUDIO_RPC=y\n"),
                ("left", "# CONFIG_ZMK_STUDIO is not set\n"),
            ] {
                let dir = build_dir.join(name).join("zephyr");
                fs::create_dir_all(&dir).unwrap();
                let mut text = config.to_string();
                if leak_rpc_into_left && name == "left" {
                    text.push_str("CONFIG_ZMK_BATTERY_HISTORY_STUDIO_RPC=y\n");
                }
                fs::write(dir.join(".config"), text).unwrap();
                fs::write(dir.join("zmk.uf2"), b"uf2").unwrap();
            }
            exited(0, &format!("built {}\n", inv.args[1]), "")
        })
    }

    fn scenario_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_split_scenario_passes() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let invoker = split_builder(session.build_dir().to_path_buf(), false);
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout).quiet(true);
        let path = scenario_file(ws.path(), "split.yaml", SPLIT);

        let result = harness.run_scenario(&path).await.unwrap();

        assert_eq!(result.outcome, Outcome::Passed, "{:?}", result.failures);
        let calls = invoker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec!["zmk-build", "split-config/config", "-m", "split-config", ".", "-q", "-p", "always"]
        );
        assert_eq!(calls[0].working_dir, ws.path());
        assert_eq!(result.verification.unwrap().artifacts.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_outputs_are_purged_before_build() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        // A previous run left a passing artifact behind; this build produces nothing
        let stale = session.build_dir().join("right").join("zephyr");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join(".config"), "CONFIG_ZMK_STUDIO=y\n").unwrap();
        fs::write(stale.join("zmk.uf2"), b"uf2").unwrap();
        let unrelated = session.build_dir().join("other_board");
        fs::create_dir_all(&unrelated).unwrap();

        let invoker = MockInvoker::new(|_| exited(0, "", ""));
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout).quiet(true);
        let path = scenario_file(ws.path(), "split.yaml", SPLIT);

        let result = harness.run_scenario(&path).await.unwrap();

        assert!(result.is_failure());
        assert!(!stale.exists());
        assert!(unrelated.exists());
        assert!(result.failures.iter().any(|f| f.contains("right/zephyr/.config is missing")));
        assert!(result.failures.iter().any(|f| f.starts_with("right zmk.uf2 is missing in ")));
    }

    #[tokio::test]
    async fn test_content_violation_fails_scenario() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let invoker = split_builder(session.build_dir().to_path_buf(), true);
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout).quiet(true);
        let path = scenario_file(ws.path(), "split.yaml", SPLIT);

        let result = harness.run_scenario(&path).await.unwrap();

        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].contains("CONFIG_ZMK_BATTERY_HISTORY_STUDIO_RPC found in"));
        assert!(result.failures[0].contains("for left"));
    }

    #[tokio::test]
    async fn test_builder_failure_surfaces_output_verbatim() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let invoker = MockInvoker::new(|_| {
            exited(2, "-- west build: generating a build system\n", "CMake Error: board not found\n")
        });
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout).quiet(true);
        let path = scenario_file(ws.path(), "split.yaml", SPLIT);

        let result = harness.run_scenario(&path).await.unwrap();

        assert!(result.is_failure());
        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].contains("exit code 2"));
        assert!(result.failures[0].ends_with(
            "-- west build: generating a build system\nCMake Error: board not found\n"
        ));
        assert!(result.verification.is_none());
    }

    #[tokio::test]
    async fn test_matrix_scenario_is_skipped_off_platform() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let invoker = MockInvoker::new(|_| exited(0, "", ""));
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout)
            .quiet(true)
            .host(Some(Platform::MacOS));
        let path = scenario_file(ws.path(), "matrix.yaml", MATRIX);

        let summary = harness.run_suite(&[path]).await;

        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.passed(), 0);
        assert_eq!(summary.failed(), 0);
        assert!(summary.success());
        assert_eq!(
            summary.results[0].outcome,
            Outcome::Skipped {
                reason: "zmk-test is only supported on linux".to_string()
            }
        );
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_matrix_scenario_checks_stdout() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let tests_out = session.build_dir().join("tests");
        fs::create_dir_all(&tests_out).unwrap();
        let builder = BuilderConfig::default();
        let path = scenario_file(ws.path(), "matrix.yaml", MATRIX);

        let passing = MockInvoker::new(|_| exited(0, "PASS: battery-history\n", ""));
        let driver = BuildDriver::new(&passing, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout)
            .quiet(true)
            .host(Some(Platform::Linux));
        let result = harness.run_scenario(&path).await.unwrap();
        assert_eq!(result.outcome, Outcome::Passed);
        assert!(!tests_out.exists());
        assert_eq!(passing.calls()[0].args, vec!["zmk-test", "tests", "-m", ".", "-v"]);

        let failing = MockInvoker::new(|_| exited(0, "FAIL: battery-history\n", ""));
        let driver = BuildDriver::new(&failing, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout)
            .quiet(true)
            .host(Some(Platform::Linux));
        let result = harness.run_scenario(&path).await.unwrap();
        assert!(result.is_failure());
        assert!(result.failures[0].contains("'PASS: battery-history' not found"));
        assert!(result.failures[0].contains("FAIL: battery-history"));
    }

    #[tokio::test]
    async fn test_unloadable_scenario_is_recorded_and_suite_continues() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let invoker = split_builder(session.build_dir().to_path_buf(), false);
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout).quiet(true);
        let good = scenario_file(ws.path(), "split.yaml", SPLIT);
        let missing = ws.path().join("missing.yaml");

        let summary = harness.run_suite(&[missing, good]).await;

        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.results[0].name, "missing");
        assert!(!summary.success());
    }

    #[tokio::test]
    async fn test_rerun_gives_identical_outcome() {
        let ws = tempfile::tempdir().unwrap();
        let layout = LayoutConfig::default();
        let session = SessionContext::new(ws.path(), &layout);
        let invoker = split_builder(session.build_dir().to_path_buf(), false);
        let builder = BuilderConfig::default();
        let driver = BuildDriver::new(&invoker, PathBuf::from("west"), &builder);
        let harness = Harness::new(&session, &driver, &layout).quiet(true);
        let path = scenario_file(ws.path(), "split.yaml", SPLIT);

        let first = harness.run_scenario(&path).await.unwrap();
        let second = harness.run_scenario(&path).await.unwrap();

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.failures, second.failures);
        assert_eq!(invoker.calls().len(), 2);
    }
}
