//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Batch GitOps - reconcile a fleet of Git repositories in one run
#[derive(Parser, Debug)]
#[command(name = "batch-gitops")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the five-stage pipeline over all configured repositories
    Run(commands::run::RunArgs),

    /// Load and validate a configuration file without touching any repository
    Validate(commands::validate::ValidateArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => commands::run::execute(args),
            Commands::Validate(args) => commands::validate::execute(args),
        }
    }
}
