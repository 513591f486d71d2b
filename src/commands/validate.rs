//! Validate command implementation
//!
//! Loads a configuration file, runs the same expansion and validation as the
//! run command, and prints a short summary. No repository is touched.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to config file
    #[arg(short, long, value_name = "PATH", env = "BATCH_GITOPS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Execute the validate command
pub fn execute(args: ValidateArgs) -> Result<()> {
    use batch_gitops::config;

    let config_path = args.config.unwrap_or_else(|| PathBuf::from("config.json"));
    let config = config::from_file(&config_path)?;
    let plan = config.execution_plan();

    println!("configuration OK: {}", config_path.display());
    println!("  repositories: {}", config.repositories.len());
    println!("  replacement rules: {}", config.replacements.len());
    println!("  commands: {}", config.commands.len());
    println!("  source branch: {}", config.global.source_branch);
    println!("  personal branch: {}", config.personal_branch);

    let mut disabled = Vec::new();
    if !plan.clone {
        disabled.push("clone");
    }
    if !plan.branch {
        disabled.push("branch");
    }
    if !plan.replacements {
        disabled.push("replacements");
    }
    if !plan.commands {
        disabled.push("commands");
    }
    if !plan.commit {
        disabled.push("commit");
    }
    if !disabled.is_empty() {
        println!("  disabled stages: {}", disabled.join(", "));
    }

    Ok(())
}
