//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `batch-gitops` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! Two classes of failure matter to the pipeline:
//!
//! - **Fatal-to-run**: configuration problems (`ConfigParse`, `Json`, `Io`
//!   while loading) abort the whole run before any repository is touched.
//! - **Fatal-to-repository**: git failures (`GitClone`, `GitCommand`) abort
//!   the affected repository. They are converted to a boolean failure at the
//!   pipeline boundary and tallied; they never terminate the process.
//!
//! Advisory failures (a command exiting non-zero, an unreadable file during
//! replacement) are not modeled as `Error` values at all; they are absorbed
//! where they occur and surface only through the run statistics.

use thiserror::Error;

/// Main error type for batch-gitops operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while loading or validating the configuration file.
    ///
    /// This error includes the specific issue and optionally a hint about how
    /// to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while cloning a Git repository.
    #[error("Git clone error for {url}: {message}")]
    GitClone { url: String, message: String },

    /// An error occurred while executing a Git command inside a working tree.
    #[error("Git command failed in {dir}: git {command} - {stderr}")]
    GitCommand {
        command: String,
        dir: String,
        stderr: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
