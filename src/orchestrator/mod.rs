//! Test orchestration.
//!
//! A [`TestPlan`] is run strictly sequentially by a [`TestOrchestrator`]; each
//! invocation is bannered, executed through the process runner and classified,
//! and the run ends with one [`RunOutcome`].

pub mod outcome;
pub mod plan;
pub mod runner;

pub use outcome::{RunOutcome, RunState, TestResult};
pub use plan::{TestInvocation, TestPlan};
pub use runner::{BANNER, RunHandle, TestOrchestrator};
