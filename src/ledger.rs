//! # Execution Ledger
//!
//! Per-run accounting of the five pipeline stages. For every stage a
//! repository reaches, the orchestrator makes exactly one call: either
//! [`ExecutionLedger::record_skip`] (stage gated off for that repository) or
//! [`ExecutionLedger::record_execute`] (stage ran, with its outcome). Stages
//! a repository never reaches (because an earlier required stage failed)
//! receive no call at all, so a stage's totals may be lower than the
//! repository count.
//!
//! Counters only ever increase; classification happens once at run end.

use crate::config::ExecutionPlan;
use log::info;

/// The five ordered phases of per-repository processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Clone,
    Branch,
    Replacements,
    Commands,
    Commit,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Clone,
        Stage::Branch,
        Stage::Replacements,
        Stage::Commands,
        Stage::Commit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Clone => "clone/pull",
            Stage::Branch => "branch",
            Stage::Replacements => "replacements",
            Stage::Commands => "commands",
            Stage::Commit => "commit/push",
        }
    }

    fn index(self) -> usize {
        match self {
            Stage::Clone => 0,
            Stage::Branch => 1,
            Stage::Replacements => 2,
            Stage::Commands => 3,
            Stage::Commit => 4,
        }
    }
}

/// Counters for one stage across the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageOutcome {
    pub enabled: bool,
    pub executed: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// End-of-run classification of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// The stage was never enabled.
    Disabled,
    /// Enabled, but no repository ever offered input for it.
    NotExecuted,
    /// Every attempted execution succeeded.
    FullySucceeded { executed: usize, skipped: usize },
    /// At least one attempted execution failed.
    PartiallyFailed { succeeded: usize, failed: usize },
}

/// Append-only stage accounting for one run.
#[derive(Debug)]
pub struct ExecutionLedger {
    outcomes: [StageOutcome; 5],
}

impl ExecutionLedger {
    pub fn new(plan: &ExecutionPlan) -> Self {
        let mut outcomes = [StageOutcome::default(); 5];
        outcomes[Stage::Clone.index()].enabled = plan.clone;
        outcomes[Stage::Branch.index()].enabled = plan.branch;
        outcomes[Stage::Replacements.index()].enabled = plan.replacements;
        outcomes[Stage::Commands.index()].enabled = plan.commands;
        outcomes[Stage::Commit.index()].enabled = plan.commit;
        Self { outcomes }
    }

    /// Record that a repository skipped `stage`.
    pub fn record_skip(&mut self, stage: Stage) {
        self.outcomes[stage.index()].skipped += 1;
    }

    /// Record that a repository executed `stage` with the given outcome.
    pub fn record_execute(&mut self, stage: Stage, success: bool) {
        let outcome = &mut self.outcomes[stage.index()];
        outcome.executed += 1;
        if success {
            outcome.succeeded += 1;
        } else {
            outcome.failed += 1;
        }
    }

    pub fn outcome(&self, stage: Stage) -> &StageOutcome {
        &self.outcomes[stage.index()]
    }

    /// Classify a stage once all repositories have been processed.
    pub fn classify(&self, stage: Stage) -> StageStatus {
        let outcome = self.outcome(stage);
        if !outcome.enabled {
            StageStatus::Disabled
        } else if outcome.executed == 0 && outcome.skipped == 0 {
            StageStatus::NotExecuted
        } else if outcome.failed == 0 {
            StageStatus::FullySucceeded {
                executed: outcome.executed,
                skipped: outcome.skipped,
            }
        } else {
            StageStatus::PartiallyFailed {
                succeeded: outcome.succeeded,
                failed: outcome.failed,
            }
        }
    }

    /// Log the stage summary for the whole run.
    pub fn log_summary(&self) {
        info!("{}", "=".repeat(60));
        info!("stage summary");
        info!("{}", "=".repeat(60));

        for stage in Stage::ALL {
            let status = match self.classify(stage) {
                StageStatus::Disabled => "disabled".to_string(),
                StageStatus::NotExecuted => "not executed".to_string(),
                StageStatus::FullySucceeded { executed, skipped } => {
                    format!("ok ({}/{})", executed, executed + skipped)
                }
                StageStatus::PartiallyFailed { succeeded, failed } => {
                    format!("partial failure (ok: {}, failed: {})", succeeded, failed)
                }
            };
            info!("{:14} {}", stage.label(), status);
        }
        info!("{}", "=".repeat(60));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_plan() -> ExecutionPlan {
        ExecutionPlan::default()
    }

    #[test]
    fn test_execute_splits_into_success_and_failure() {
        let mut ledger = ExecutionLedger::new(&enabled_plan());
        ledger.record_execute(Stage::Clone, true);
        ledger.record_execute(Stage::Clone, false);
        ledger.record_execute(Stage::Clone, true);

        let outcome = ledger.outcome(Stage::Clone);
        assert_eq!(outcome.executed, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.executed, outcome.succeeded + outcome.failed);
    }

    #[test]
    fn test_skip_and_execute_are_disjoint_counters() {
        let mut ledger = ExecutionLedger::new(&enabled_plan());
        ledger.record_skip(Stage::Branch);
        ledger.record_execute(Stage::Branch, true);

        let outcome = ledger.outcome(Stage::Branch);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.executed, 1);
        assert_eq!(outcome.executed + outcome.skipped, 2);
    }

    #[test]
    fn test_classify_disabled() {
        let plan = ExecutionPlan {
            commit: false,
            ..enabled_plan()
        };
        let mut ledger = ExecutionLedger::new(&plan);
        // A disabled stage can still be skip-recorded; disabled wins.
        ledger.record_skip(Stage::Commit);
        assert_eq!(ledger.classify(Stage::Commit), StageStatus::Disabled);
    }

    #[test]
    fn test_classify_not_executed() {
        let ledger = ExecutionLedger::new(&enabled_plan());
        assert_eq!(ledger.classify(Stage::Commands), StageStatus::NotExecuted);
    }

    #[test]
    fn test_classify_fully_succeeded_counts_skips() {
        let mut ledger = ExecutionLedger::new(&enabled_plan());
        ledger.record_execute(Stage::Replacements, true);
        ledger.record_skip(Stage::Replacements);

        assert_eq!(
            ledger.classify(Stage::Replacements),
            StageStatus::FullySucceeded {
                executed: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_classify_partially_failed() {
        let mut ledger = ExecutionLedger::new(&enabled_plan());
        ledger.record_execute(Stage::Clone, true);
        ledger.record_execute(Stage::Clone, false);

        assert_eq!(
            ledger.classify(Stage::Clone),
            StageStatus::PartiallyFailed {
                succeeded: 1,
                failed: 1
            }
        );
    }
}
