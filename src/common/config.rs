//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// How to invoke the external builder
    #[serde(default)]
    pub builder: BuilderConfig,

    /// Where the builder places its outputs
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// External builder settings
#[derive(Debug, Deserialize, Clone)]
pub struct BuilderConfig {
    /// Builder executable, either a bare name looked up in PATH or a path
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before every subcommand, e.g. `["-m", "west"]` when
    /// `program` is a Python interpreter
    #[serde(default)]
    pub program_args: Vec<String>,

    /// Subcommand that prints the workspace root
    #[serde(default = "default_topdir_command")]
    pub topdir_command: String,

    /// Subcommand that builds named configurations
    #[serde(default = "default_build_command")]
    pub build_command: String,

    /// Subcommand that runs the full test-configuration matrix
    #[serde(default = "default_test_command")]
    pub test_command: String,

    /// Flags used by build scenarios that don't list their own
    #[serde(default = "default_build_flags")]
    pub default_build_flags: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            program_args: Vec::new(),
            topdir_command: default_topdir_command(),
            build_command: default_build_command(),
            test_command: default_test_command(),
            default_build_flags: default_build_flags(),
        }
    }
}

fn default_program() -> String {
    "west".to_string()
}
fn default_topdir_command() -> String {
    "topdir".to_string()
}
fn default_build_command() -> String {
    "zmk-build".to_string()
}
fn default_test_command() -> String {
    "zmk-test".to_string()
}
fn default_build_flags() -> Vec<String> {
    vec!["-q".to_string()]
}

/// Build output layout
#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    /// Build-output directory, relative to the workspace root
    #[serde(default = "default_build_subdir")]
    pub build_subdir: String,

    /// Directory inside each artifact holding the config and binary
    #[serde(default = "default_toolchain_subdir")]
    pub toolchain_subdir: String,

    /// Resolved configuration file name
    #[serde(default = "default_config_name")]
    pub config_name: String,

    /// Firmware binary file name
    #[serde(default = "default_binary_name")]
    pub binary_name: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            build_subdir: default_build_subdir(),
            toolchain_subdir: default_toolchain_subdir(),
            config_name: default_config_name(),
            binary_name: default_binary_name(),
        }
    }
}

fn default_build_subdir() -> String {
    "build".to_string()
}
fn default_toolchain_subdir() -> String {
    "zephyr".to_string()
}
fn default_config_name() -> String {
    ".config".to_string()
}
fn default_binary_name() -> String {
    "zmk.uf2".to_string()
}

impl Config {
    /// Load configuration from an explicit file, or the default config file
    ///
    /// An explicit path must exist. A missing default file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

impl BuilderConfig {
    /// Resolve the builder executable
    ///
    /// Bare names are searched in PATH; anything containing a path separator
    /// is used as given.
    pub fn resolve_program(&self) -> Result<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 || program.is_absolute() {
            return Ok(program.to_path_buf());
        }
        which::which(&self.program).map_err(|_| Error::BuilderNotFound(self.program.clone()))
    }
}
