//! # Repository Pipeline
//!
//! Drives one repository through the five ordered stages (clone/pull,
//! branch reconciliation, replacements, commands, commit/push), consulting
//! the stage-enablement plan, and aggregates the run-level result.
//!
//! Failure severity differs per stage: a clone/pull or branch failure aborts
//! the repository; replacement and command failures are advisory; a
//! commit/push failure is logged as a warning but the stage is still
//! ledgered as success. The overall repository result is therefore failure
//! only when stage 1 or 2 fails.

use std::fs;
use std::path::PathBuf;

use crate::branch;
use crate::command::CommandRunner;
use crate::config::{normalize_commands, CommandSpec, Config, ExecutionPlan, OnError};
use crate::error::Result;
use crate::git::{Credentials, GitBackend, GitOps};
use crate::ledger::{ExecutionLedger, Stage};
use crate::replace::{self, RuleStats};
use crate::template;
use log::{error, info, warn};

/// Aggregated outcome of a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
    pub ledger: ExecutionLedger,
    pub stats: RuleStats,
}

/// Sequential driver for all configured repositories.
pub struct Pipeline<'a> {
    config: &'a Config,
    plan: ExecutionPlan,
    commands: Vec<CommandSpec>,
    git: GitOps<'a>,
    runner: CommandRunner,
    work_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, backend: &'a dyn GitBackend, work_dir: PathBuf) -> Self {
        let plan = config.execution_plan();
        let commands = normalize_commands(&config.commands);
        let git = GitOps::new(backend, Credentials::from(&config.global));
        let runner = CommandRunner::new(
            config.global.on_error,
            config.global.show_command_output,
        );
        Self {
            config,
            plan,
            commands,
            git,
            runner,
            work_dir,
        }
    }

    /// Process every repository in configured order, then run parent-scoped
    /// commands once and log the run summaries.
    pub fn run(&self) -> Result<RunReport> {
        fs::create_dir_all(&self.work_dir)?;

        let mut ledger = ExecutionLedger::new(&self.plan);
        let mut stats = RuleStats::new();
        let mut succeeded = 0;
        let mut failed = 0;

        for spec in &self.config.repositories {
            info!("{}", "=".repeat(60));
            info!("processing repository: {}", spec.name);
            info!("{}", "=".repeat(60));

            if self.process_repository(spec, &mut ledger, &mut stats) {
                succeeded += 1;
            } else {
                failed += 1;
                if self.config.global.on_error == OnError::Stop {
                    error!("repository failed, aborting remaining repositories");
                    break;
                }
            }
        }

        if !self.commands.is_empty() && self.plan.commands {
            info!("{}", "=".repeat(60));
            info!("running parent-scoped commands");
            info!("{}", "=".repeat(60));
            self.runner.run_parent_scoped(&self.work_dir, &self.commands);
        }

        info!("{}", "=".repeat(60));
        info!("batch complete: {} succeeded, {} failed", succeeded, failed);
        info!("{}", "=".repeat(60));
        ledger.log_summary();
        stats.log_summary();

        Ok(RunReport {
            succeeded,
            failed,
            ledger,
            stats,
        })
    }

    /// Drive one repository through the five stages.
    ///
    /// Never propagates an error: every failure is logged, recorded and
    /// reduced to the boolean repository result.
    fn process_repository(
        &self,
        spec: &crate::config::RepositorySpec,
        ledger: &mut ExecutionLedger,
        stats: &mut RuleStats,
    ) -> bool {
        let tree = self.work_dir.join(&spec.name);
        let source_branch = &self.config.global.source_branch;

        // Stage 1: clone/pull. The only unconditionally fatal stage; without
        // a working tree nothing later can run.
        if self.plan.clone {
            match self.git.clone_or_pull(&spec.url, &tree, source_branch) {
                Ok(()) => ledger.record_execute(Stage::Clone, true),
                Err(e) => {
                    error!("clone/pull failed for {}: {}", spec.name, e);
                    ledger.record_execute(Stage::Clone, false);
                    return false;
                }
            }
        } else {
            ledger.record_skip(Stage::Clone);
            info!("skipping clone/pull: {}", spec.name);
            if !tree.exists() {
                error!(
                    "working tree missing and clone/pull skipped: {}",
                    spec.name
                );
                return false;
            }
        }

        // Stage 2: branch reconciliation.
        if self.plan.branch {
            match branch::reconcile(
                &self.git,
                &tree,
                source_branch,
                &self.config.personal_branch,
                self.config.global.branch_exists_strategy,
            ) {
                Ok(()) => ledger.record_execute(Stage::Branch, true),
                Err(e) => {
                    error!("branch reconciliation failed for {}: {}", spec.name, e);
                    ledger.record_execute(Stage::Branch, false);
                    return false;
                }
            }
        } else {
            ledger.record_skip(Stage::Branch);
            info!("skipping branch stage: {}", spec.name);
        }

        // Stage 3: replacements. Per-file problems are absorbed into the
        // rule statistics; the stage itself always executes successfully.
        if !self.config.replacements.is_empty() {
            if self.plan.replacements {
                info!(
                    "applying {} replacement rule(s)...",
                    self.config.replacements.len()
                );
                replace::apply_rules(&tree, &self.config.replacements, &spec.name, stats);
                ledger.record_execute(Stage::Replacements, true);
            } else {
                ledger.record_skip(Stage::Replacements);
                info!("skipping replacements stage: {}", spec.name);
            }
        }

        // Stage 4: repository-scoped commands. Failures are advisory.
        if !self.commands.is_empty() {
            if self.plan.commands {
                let (successes, failures) = self.runner.run_repo_scoped(&tree, &self.commands);
                if successes + failures > 0 {
                    ledger.record_execute(Stage::Commands, failures == 0);
                } else {
                    info!("no repository-scoped commands for {}", spec.name);
                }
            } else {
                ledger.record_skip(Stage::Commands);
                info!("skipping commands stage: {}", spec.name);
            }
        }

        // Stage 5: commit/push. A failure here is advisory: the stage is
        // ledgered as success and only a warning is logged, because the
        // repository's substantive work has already been applied.
        if self.plan.commit {
            let vars = template::commit_vars(
                &spec.name,
                self.config.replacements.len(),
                self.config.commands.len(),
                &self.config.commit.variables,
            );
            let message = template::render(&self.config.commit.message, &vars);
            ledger.record_execute(Stage::Commit, true);
            if let Err(e) =
                self.git
                    .commit_and_push(&tree, &self.config.personal_branch, &message)
            {
                warn!("commit/push failed for {}: {}", spec.name, e);
            }
        } else {
            ledger.record_skip(Stage::Commit);
            info!("skipping commit/push stage: {}", spec.name);
        }

        info!("repository complete: {}", spec.name);
        true
    }
}
