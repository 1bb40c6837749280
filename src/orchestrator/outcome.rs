//! Run state, per-test results and the aggregated run outcome.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Interrupted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Interrupted)
    }
}

/// Result of one invocation. Passed iff the exit code is zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    /// 1-based position in the run
    pub index: usize,
    pub name: String,
    pub exit_code: i32,
    pub passed: bool,
    pub duration_ms: u64,
}

impl TestResult {
    pub fn new(index: usize, name: impl Into<String>, exit_code: i32, duration_ms: u64) -> Self {
        Self {
            index,
            name: name.into(),
            exit_code,
            passed: exit_code == 0,
            duration_ms,
        }
    }
}

/// Everything a run produced, finalized exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub state: RunState,
    pub results: Vec<TestResult>,
    /// Error chain of the failure that interrupted the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interruption: Vec<String>,
}

impl RunOutcome {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            state: RunState::Running,
            results: Vec::new(),
            interruption: Vec::new(),
        }
    }

    pub fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    /// Names of failed tests, in the order they failed.
    pub fn failures(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// True when the run completed and every test passed.
    pub fn passed(&self) -> bool {
        self.state == RunState::Completed && self.results.iter().all(|r| r.passed)
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let failures = self.failures();
        if failures.is_empty() {
            return vec!["all tests passed".to_string()];
        }
        let mut lines = Vec::with_capacity(failures.len() + 1);
        lines.push(format!("{} tests failed", failures.len()));
        lines.extend(failures.into_iter().map(str::to_string));
        lines
    }

    pub fn summary(&self) -> String {
        self.summary_lines().join("\n")
    }

    /// Move to a terminal state. Later calls are ignored.
    pub fn finish(&mut self, state: RunState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.finished_at = Some(Utc::now());
    }

    pub fn interrupt(&mut self, chain: Vec<String>) {
        if self.state.is_terminal() {
            return;
        }
        self.interruption = chain;
        self.finish(RunState::Interrupted);
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Write the outcome as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run outcome")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run report {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse run report")
    }
}

impl Default for RunOutcome {
    fn default() -> Self {
        Self::new()
    }
}
