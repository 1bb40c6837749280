use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use qjs_harness::config::HARNESS_DIR;
use qjs_harness::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "qjs-harness")]
#[command(version, about = "Acceptance test runner for the QuickJS native executables")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the test plan and write the transcript and report
    Run {
        /// Run only tests in this group (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,
    },
    /// List the tests that `run` would execute
    Plan {
        /// Show only tests in this group (repeatable)
        #[arg(short, long = "group")]
        groups: Vec<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the configuration file and effective values
    Show,
    /// Check the configuration for problems
    Validate,
    /// Write a default harness.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // Only runs keep a diagnostic log file next to the transcript.
    let log_dir = match cli.command {
        Commands::Run { .. } => Some(project_dir.join(HARNESS_DIR).join("logs")),
        _ => None,
    };
    let _guard = logging::init_tracing(cli.verbose, log_dir.as_deref())?;

    match &cli.command {
        Commands::Run { groups } => cmd::cmd_run(&cli, project_dir, groups.clone()).await?,
        Commands::Plan { groups } => cmd::cmd_plan(&project_dir, groups.clone())?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
