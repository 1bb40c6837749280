//! Sequential test execution on a background task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use super::outcome::{RunOutcome, RunState, TestResult};
use super::plan::{TestInvocation, TestPlan};
use crate::errors::HarnessError;
use crate::hub::LogHub;
use crate::process::ProcessRunner;
use crate::setup::{NativeLibraries, NoPrerequisites, Prerequisites};

pub const BANNER: &str = "********************************";

/// Runs a [`TestPlan`] one invocation at a time, reporting into a [`LogHub`].
pub struct TestOrchestrator {
    hub: Arc<LogHub>,
    runner: ProcessRunner,
    plan: TestPlan,
    natives: NativeLibraries,
    working_dir: PathBuf,
    prerequisites: Box<dyn Prerequisites>,
    report_path: Option<PathBuf>,
    state: watch::Sender<RunState>,
    test_number: usize,
}

impl TestOrchestrator {
    /// * `natives`: resolves each invocation's executable
    /// * `working_dir`: directory every test runs in, normally the assets dir
    pub fn new(
        hub: Arc<LogHub>,
        plan: TestPlan,
        natives: NativeLibraries,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        let (state, _) = watch::channel(RunState::NotStarted);
        Self {
            runner: ProcessRunner::new(Arc::clone(&hub)),
            hub,
            plan,
            natives,
            working_dir: working_dir.into(),
            prerequisites: Box::new(NoPrerequisites),
            report_path: None,
            state,
            test_number: 0,
        }
    }

    pub fn with_prerequisites(mut self, prerequisites: impl Prerequisites + 'static) -> Self {
        self.prerequisites = Box::new(prerequisites);
        self
    }

    /// Write the final outcome as JSON to `path` once the run ends.
    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Begin the run on a background task and return immediately.
    pub fn start(self) -> RunHandle {
        let state = self.state.subscribe();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = self.run().await;
            if tx.send(outcome).is_err() {
                warn!("run handle dropped before the outcome was delivered");
            }
        });
        RunHandle { state, outcome: rx }
    }

    /// Run the whole plan on the current task.
    ///
    /// Never fails: setup errors and panics interrupt the run and end up in
    /// the returned outcome and the log. The hub is finished exactly once.
    pub async fn run(mut self) -> RunOutcome {
        let mut outcome = RunOutcome::new();
        self.state.send_replace(RunState::Running);
        info!(run_id = %outcome.run_id, tests = self.plan.len(), "run started");

        let result = AssertUnwindSafe(self.execute(&mut outcome))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                for line in outcome.summary_lines() {
                    self.hub.print(line);
                }
                self.print_terminal_banner("TEST COMPLETE");
                outcome.finish(RunState::Completed);
            }
            Ok(Err(err)) => {
                error!(error = %format!("{:#}", err), "run interrupted");
                self.print_terminal_banner("TEST INTERRUPT");
                let chain = error_chain(&err);
                for line in &chain {
                    self.hub.print(line);
                }
                outcome.interrupt(chain);
            }
            Err(panic) => {
                let message = format!("Internal error: {}", panic_message(panic.as_ref()));
                error!(error = %message, "run panicked");
                self.print_terminal_banner("TEST INTERRUPT");
                self.hub.print(&message);
                outcome.interrupt(vec![message]);
            }
        }

        if let Err(err) = self.hub.finish() {
            warn!(error = %err, "transcript could not be completed");
        }
        if let Some(path) = &self.report_path {
            match outcome.save(path) {
                Ok(()) => info!(path = %path.display(), "run report written"),
                Err(err) => warn!(error = %format!("{:#}", err), "run report not written"),
            }
        }

        info!(
            run_id = %outcome.run_id,
            state = ?outcome.state,
            failed = outcome.failures().len(),
            "run finished"
        );
        self.state.send_replace(outcome.state);
        outcome
    }

    async fn execute(&mut self, outcome: &mut RunOutcome) -> Result<()> {
        self.prepare().await?;

        let invocations = self.plan.invocations().to_vec();
        for invocation in &invocations {
            let result = self.run_test(invocation).await;
            outcome.record(result);
        }
        Ok(())
    }

    /// Run the prerequisites on the blocking pool; asset extraction is
    /// synchronous filesystem work.
    async fn prepare(&mut self) -> Result<()> {
        let mut prerequisites =
            std::mem::replace(&mut self.prerequisites, Box::new(NoPrerequisites));
        let hub = Arc::clone(&self.hub);

        let joined = tokio::task::spawn_blocking(move || {
            let result = prepare_blocking(prerequisites.as_mut(), &hub);
            (prerequisites, result)
        })
        .await;

        match joined {
            Ok((prerequisites, result)) => {
                self.prerequisites = prerequisites;
                result
            }
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(anyhow::Error::new(err).context("Setup task was cancelled")),
        }
    }

    async fn run_test(&mut self, invocation: &TestInvocation) -> TestResult {
        self.test_number += 1;
        let index = self.test_number;
        let name = invocation.name();

        self.hub.print(BANNER);
        self.hub.print(format!("** {}. {}", index, name));
        self.hub.print(BANNER);

        let executable = self.natives.resolve(&invocation.executable);
        let started = Instant::now();
        let code = self
            .runner
            .run(&executable, &invocation.args, &self.working_dir)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = TestResult::new(index, name, code, duration_ms);
        self.hub.print(format!("EXIT CODE: {}", code));
        self.hub.print(if result.passed { "PASSED" } else { "FAILED" });
        debug!(index, name = %result.name, code, duration_ms, "test finished");
        result
    }

    fn print_terminal_banner(&self, status: &str) {
        for _ in 0..3 {
            self.hub.print(BANNER);
        }
        self.hub.print(status);
    }
}

/// Caller's side of a run started with [`TestOrchestrator::start`].
#[derive(Debug)]
pub struct RunHandle {
    state: watch::Receiver<RunState>,
    outcome: oneshot::Receiver<RunOutcome>,
}

impl RunHandle {
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Receiver that is notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Wait for the run to end and take its outcome.
    pub async fn wait(self) -> Result<RunOutcome, HarnessError> {
        self.outcome
            .await
            .map_err(|err| HarnessError::WorkerLost(err.to_string()))
    }
}

fn prepare_blocking(prerequisites: &mut dyn Prerequisites, hub: &LogHub) -> Result<()> {
    prerequisites
        .ensure_assets_present(hub)
        .context("Failed to prepare test assets")?;
    prerequisites
        .load_native_components(hub)
        .context("Failed to load native executables")?;
    Ok(())
}

fn error_chain(err: &anyhow::Error) -> Vec<String> {
    err.chain()
        .enumerate()
        .map(|(i, cause)| {
            if i == 0 {
                cause.to_string()
            } else {
                format!("Caused by: {}", cause)
            }
        })
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
