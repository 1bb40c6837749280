//! Configuration view and validation commands (`qjs-harness config`).

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use qjs_harness::config::{HARNESS_DIR, HarnessConfig, HarnessToml};

    let harness_dir = project_dir.join(HARNESS_DIR);
    let config_path = harness_dir.join(qjs_harness::config::CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Harness Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No harness.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let config = HarnessConfig::new(project_dir.to_path_buf())?;
            let toml = &config.toml;

            println!("[paths]");
            println!("  native_dir = \"{}\"", config.native_dir().display());
            println!("  bundle_dir = \"{}\"", config.bundle_dir().display());
            println!("  executable_pattern = \"{}\"", toml.paths.executable_pattern);
            println!();
            println!("[log]");
            println!("  capacity = {}", toml.log.capacity);
            println!("  transcript = \"{}\"", config.transcript_path().display());
            println!();

            let plan = config.plan();
            if toml.tests.is_empty() {
                println!("Tests: built-in QuickJS plan ({} tests)", plan.len());
            } else {
                println!("Tests: {} configured in [[tests]]", plan.len());
            }
            println!("Groups: {}", plan.groups().join(", "));
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No harness.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = HarnessToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("harness.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !harness_dir.exists() {
                std::fs::create_dir_all(&harness_dir)?;
            }

            let toml = HarnessToml::default();
            toml.save(&config_path)?;

            println!("Created harness.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [paths] native_dir, bundle_dir, executable_pattern");
            println!("  - [log] capacity, transcript");
            println!("  - [[tests]] to replace the built-in plan");
            println!();
        }
    }

    Ok(())
}
