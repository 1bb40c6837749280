//! Test execution (`qjs-harness run`).

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::super::Cli;

pub async fn cmd_run(cli: &Cli, project_dir: PathBuf, groups: Vec<String>) -> Result<()> {
    use qjs_harness::config::HarnessConfig;
    use qjs_harness::hub::LogHub;
    use qjs_harness::orchestrator::{RunState, TestOrchestrator};
    use qjs_harness::setup::BundledPrerequisites;
    use qjs_harness::ui::TerminalObserver;
    use qjs_harness::ui::icons::{CROSS, FOLDER, SPARKLE, WARNING};

    let config = HarnessConfig::with_cli_args(project_dir, cli.verbose, groups)?;
    for warning in config.validate() {
        println!("{}{}", WARNING, warning);
    }
    config.ensure_directories()?;

    let plan = config.plan();
    if plan.is_empty() {
        anyhow::bail!("No tests to run. Check the --group filter and [[tests]] in harness.toml.");
    }

    let transcript = config.transcript_path();
    let hub = Arc::new(LogHub::create(&transcript, config.capacity())?);
    let observer = Arc::new(TerminalObserver::stdout());
    hub.attach_observer(&observer);

    let prerequisites =
        BundledPrerequisites::new(config.asset_sync(), config.natives(), plan.executables());
    let handle = TestOrchestrator::new(
        Arc::clone(&hub),
        plan,
        config.natives(),
        config.assets_dir(),
    )
    .with_prerequisites(prerequisites)
    .with_report(config.report_path())
    .start();

    let outcome = handle.wait().await?;
    observer.close();

    println!();
    println!("{}Transcript: {}", FOLDER, transcript.display());
    println!("{}Report: {}", FOLDER, config.report_path().display());

    if outcome.state == RunState::Interrupted {
        anyhow::bail!("{}Test run interrupted", CROSS);
    }
    let failures = outcome.failures();
    if !failures.is_empty() {
        anyhow::bail!("{}{} of {} tests failed", CROSS, failures.len(), outcome.results.len());
    }

    println!("{}All {} tests passed", SPARKLE, outcome.results.len());
    Ok(())
}
