//! # Batch GitOps Library
//!
//! This library provides the core functionality for batch-reconciling a
//! fleet of Git repositories against a desired branch and content state. It
//! is designed to be used by the `batch-gitops` command-line tool but can
//! also be integrated into other applications that drive bulk repository
//! maintenance.
//!
//! ## Quick Example
//!
//! ```
//! let json = r#"{
//!     "repositories": [{"name": "svc-a", "url": "https://example.com/svc-a.git"}],
//!     "personal_branch": "feature/batch-update",
//!     "commit": {"message": "chore: batch update {repo_name}"}
//! }"#;
//!
//! let config = batch_gitops::config::parse(json).unwrap();
//! assert_eq!(config.repositories.len(), 1);
//! assert_eq!(config.global.source_branch, "main");
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: The JSON run configuration (repositories,
//!   branch policy, replacement rules, operator commands) with legacy-shape
//!   normalization and `${VAR}` environment expansion.
//! - **Git Layer (`git`)**: Invocations of the system `git` binary behind the
//!   `GitBackend` trait, so decision logic can be tested without repositories.
//! - **Branch Reconciliation (`branch`)**: The state machine that positions a
//!   working tree on the personal branch under the configured strategy.
//! - **Replacement Engine (`replace`)**: Ordered search/replace rules applied
//!   across each working tree, with per-rule provenance statistics.
//! - **Command Execution (`command`)**: Operator shell commands at repository
//!   or parent scope, under a failure policy and a hard timeout.
//! - **Execution Ledger (`ledger`)**: Append-only per-stage accounting of
//!   skips, executions, successes and failures.
//! - **Pipeline (`pipeline`)**: The five-stage per-repository orchestrator
//!   and the run-level driver.
//!
//! ## Execution Flow
//!
//! For each configured repository, in order, the `pipeline` module:
//!
//! 1.  **Clones or pulls** the working tree.
//! 2.  **Reconciles** the personal branch against the source branch.
//! 3.  **Applies** the replacement rules in place.
//! 4.  **Runs** repository-scoped operator commands.
//! 5.  **Commits and pushes** the result.
//!
//! After the last repository, parent-scoped commands run once and the run
//! summaries (stage ledger and rule statistics) are logged.

pub mod branch;
pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod ledger;
pub mod logging;
pub mod pipeline;
pub mod replace;
pub mod template;
