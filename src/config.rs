//! Harness configuration read from `.harness/harness.toml`.
//!
//! Layered configuration (file → environment → CLI). Every key is optional;
//! without a file the built-in QuickJS plan runs against `native/` and
//! `bundle/` under the project directory.
//!
//! # Configuration File Format
//!
//! ```toml
//! [paths]
//! native_dir = "build/native"
//! bundle_dir = "build/bundle"
//! executable_pattern = "lib{name}.so"
//!
//! [log]
//! capacity = 8192
//! transcript = ".harness/logs/log.txt"
//!
//! [[tests]]
//! name = "closures"
//! group = "test"
//! executable = "qjs"
//! args = "tests/test_closure.js"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::buffer::DEFAULT_CAPACITY;
use crate::orchestrator::{TestInvocation, TestPlan};
use crate::setup::native::{DEFAULT_PATTERN, NAME_PLACEHOLDER};
use crate::setup::{AssetSync, NativeLibraries};

pub const HARNESS_DIR: &str = ".harness";
pub const CONFIG_FILE: &str = "harness.toml";

/// Overrides `[paths] native_dir`.
pub const NATIVE_DIR_ENV: &str = "HARNESS_NATIVE_DIR";
/// Overrides `[paths] bundle_dir`.
pub const BUNDLE_DIR_ENV: &str = "HARNESS_BUNDLE_DIR";

/// Where executables and the asset bundle live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Directory holding the native executables (default: `native`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_dir: Option<PathBuf>,
    /// Directory holding `testassets.zip` and its marker (default: `bundle`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_dir: Option<PathBuf>,
    /// File-name pattern mapping an executable id to a file
    #[serde(default = "default_executable_pattern")]
    pub executable_pattern: String,
}

fn default_executable_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            native_dir: None,
            bundle_dir: None,
            executable_pattern: default_executable_pattern(),
        }
    }
}

/// Log hub settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSection {
    /// Messages kept in memory for late-attaching observers
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Transcript file (default: `.harness/logs/log.txt`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<PathBuf>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            transcript: None,
        }
    }
}

/// Contents of `harness.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessToml {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub log: LogSection,
    /// Replaces the built-in plan when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestInvocation>,
}

impl HarnessToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse harness.toml")
    }

    /// Load `harness.toml` from `harness_dir`, or defaults if there is none.
    pub fn load_or_default(harness_dir: &Path) -> Result<Self> {
        let config_path = harness_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize harness.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.log.capacity == 0 {
            warnings.push("log.capacity is 0; a capacity of 1 will be used".to_string());
        }

        if !self.paths.executable_pattern.contains(NAME_PLACEHOLDER) {
            warnings.push(format!(
                "paths.executable_pattern '{}' does not contain {}; every test resolves to the same file",
                self.paths.executable_pattern, NAME_PLACEHOLDER
            ));
        }

        let mut seen = HashSet::new();
        for (i, test) in self.tests.iter().enumerate() {
            if test.executable.trim().is_empty() {
                warnings.push(format!("tests[{}] has an empty executable", i));
            }
            let name = test.name();
            if !seen.insert(name.clone()) {
                warnings.push(format!("Duplicate test name '{}'", name));
            }
        }

        warnings
    }
}

/// Effective configuration: `harness.toml`, then environment, then CLI.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub project_dir: PathBuf,
    /// Path to the `.harness` state directory
    pub harness_dir: PathBuf,
    pub toml: HarnessToml,
    /// CLI: verbose diagnostics
    pub verbose: bool,
    /// CLI: run only these groups (empty = all)
    pub groups: Vec<String>,
}

impl HarnessConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let harness_dir = project_dir.join(HARNESS_DIR);
        let toml = HarnessToml::load_or_default(&harness_dir)?;

        Ok(Self {
            project_dir,
            harness_dir,
            toml,
            verbose: false,
            groups: Vec::new(),
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, verbose: bool, groups: Vec<String>) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.groups = groups;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.harness_dir.join(CONFIG_FILE)
    }

    /// Native directory (env → file → `native`).
    pub fn native_dir(&self) -> PathBuf {
        self.layered_dir(NATIVE_DIR_ENV, self.toml.paths.native_dir.as_deref(), "native")
    }

    /// Bundle directory (env → file → `bundle`).
    pub fn bundle_dir(&self) -> PathBuf {
        self.layered_dir(BUNDLE_DIR_ENV, self.toml.paths.bundle_dir.as_deref(), "bundle")
    }

    /// Unpacked assets; also the working directory of every test.
    pub fn assets_dir(&self) -> PathBuf {
        self.harness_dir.join("testassets")
    }

    pub fn asset_name_file(&self) -> PathBuf {
        self.harness_dir.join("testassets.name")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.harness_dir.join("logs")
    }

    pub fn transcript_path(&self) -> PathBuf {
        match &self.toml.log.transcript {
            Some(path) => self.resolve(path),
            None => self.log_dir().join("log.txt"),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.log_dir().join("results.json")
    }

    pub fn capacity(&self) -> usize {
        self.toml.log.capacity
    }

    pub fn natives(&self) -> NativeLibraries {
        NativeLibraries::new(self.native_dir())
            .with_pattern(self.toml.paths.executable_pattern.clone())
    }

    pub fn asset_sync(&self) -> AssetSync {
        AssetSync::new(self.bundle_dir(), self.assets_dir(), self.asset_name_file())
    }

    /// The configured plan (or the built-in one), filtered by the CLI groups.
    pub fn plan(&self) -> TestPlan {
        let plan = if self.toml.tests.is_empty() {
            TestPlan::quickjs()
        } else {
            TestPlan::new(self.toml.tests.clone())
        };
        plan.filter_groups(&self.groups)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        if !self.groups.is_empty() && self.plan().is_empty() {
            warnings.push(format!(
                "No tests match the selected groups: {}",
                self.groups.join(", ")
            ));
        }
        warnings
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.log_dir()).context("Failed to create log directory")?;
        Ok(())
    }

    fn layered_dir(&self, env: &str, file: Option<&Path>, default: &str) -> PathBuf {
        match std::env::var_os(env) {
            Some(value) if !value.is_empty() => self.resolve(Path::new(&value)),
            _ => self.resolve(file.unwrap_or(Path::new(default))),
        }
    }

    /// Relative paths are taken from the project directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}
