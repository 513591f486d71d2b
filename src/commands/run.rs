//! Run command implementation
//!
//! The run command executes the full five-stage pipeline for every
//! configured repository:
//! 1. Clone or pull the working tree
//! 2. Reconcile the personal branch
//! 3. Apply replacement rules
//! 4. Run repository-scoped commands
//! 5. Commit and push
//!
//! Parent-scoped commands run once after all repositories, followed by the
//! run summaries.

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to config file
    #[arg(short, long, value_name = "PATH", env = "BATCH_GITOPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the working trees (defaults to <config dir>/repos)
    #[arg(long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Execute the run command
pub fn execute(args: RunArgs) -> Result<()> {
    use batch_gitops::config;
    use batch_gitops::git::SystemGit;
    use batch_gitops::logging;
    use batch_gitops::pipeline::Pipeline;

    let config_path = args.config.unwrap_or_else(|| PathBuf::from("config.json"));
    let config = config::from_file(&config_path)?;

    let level = args
        .log_level
        .or_else(|| config.global.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, config.global.log_dir.as_deref())?;

    let work_dir = args.work_dir.unwrap_or_else(|| {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("repos")
    });

    println!("batch-gitops run");
    println!("  config: {}", config_path.display());
    println!("  work dir: {}", work_dir.display());
    println!();

    let backend = SystemGit;
    let pipeline = Pipeline::new(&config, &backend, work_dir);
    let report = pipeline.run()?;

    // Per-repository failures are reported but do not change the exit
    // status; only configuration and top-level failures exit non-zero.
    println!(
        "done: {} succeeded, {} failed, {} files modified",
        report.succeeded,
        report.failed,
        report.stats.total_files()
    );
    Ok(())
}
