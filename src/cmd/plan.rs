//! Plan listing (`qjs-harness plan`).

use anyhow::Result;
use std::path::Path;

pub fn cmd_plan(project_dir: &Path, groups: Vec<String>) -> Result<()> {
    use qjs_harness::config::HarnessConfig;

    let config = HarnessConfig::with_cli_args(project_dir.to_path_buf(), false, groups)?;
    let plan = config.plan();
    let natives = config.natives();

    println!();
    if plan.is_empty() {
        println!("No tests selected.");
        println!();
        return Ok(());
    }

    println!("{} tests, executables from {}", plan.len(), natives.dir().display());
    println!();
    println!("{:<4} {:<12} {:<40} Executable", "#", "Group", "Name");
    println!("{:<4} {:<12} {:<40} ----------", "--", "-----", "----");

    for (i, invocation) in plan.invocations().iter().enumerate() {
        let path = natives.resolve(&invocation.executable);
        println!(
            "{:<4} {:<12} {:<40} {}",
            i + 1,
            invocation.group.as_deref().unwrap_or("-"),
            invocation.name(),
            path.file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        );
    }
    println!();
    Ok(())
}
