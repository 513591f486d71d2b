//! # Log Sink Selection
//!
//! Initializes the `env_logger` backend with the resolved log level. When a
//! log directory is configured, output goes to a timestamped file in that
//! directory instead of stderr.

use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;

/// Initialize logging with `level` (error, warn, info, debug, trace).
///
/// An unknown level falls back to `info`. Calling this when a logger is
/// already installed keeps the existing one.
pub fn init(level: &str, log_dir: Option<&Path>) -> Result<()> {
    let filter = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    let mut builder = Builder::new();
    builder.filter_level(filter);

    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)?;
        let file_name = format!(
            "batch-gitops_{}.log",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let file = File::create(dir.join(file_name))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    let _ = builder.try_init();
    Ok(())
}
