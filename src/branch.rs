//! # Personal-Branch Reconciliation
//!
//! Positions a working tree on the personal branch, deciding between
//! create, check out, reset and recreate based on where the branch already
//! exists (locally, only on the remote, or nowhere) and the configured
//! [`BranchExistsStrategy`].
//!
//! No rollback is attempted on failure; the tree is left in whatever state
//! the last successful git command produced.

use std::path::Path;

use crate::config::BranchExistsStrategy;
use crate::error::Result;
use crate::git::GitOps;
use log::info;

/// Reconcile `personal_branch` against `source_branch` in `dir`.
///
/// The source branch is checked out and fast-forwarded first, so a
/// newly-created personal branch always starts at the remote source tip.
pub fn reconcile(
    git: &GitOps<'_>,
    dir: &Path,
    source_branch: &str,
    personal_branch: &str,
    strategy: BranchExistsStrategy,
) -> Result<()> {
    git.checkout(dir, source_branch)?;
    git.pull(dir, source_branch)?;

    if git.local_branch_exists(dir, personal_branch)? {
        info!("local branch '{}' already exists", personal_branch);
        return reconcile_existing_local(git, dir, source_branch, personal_branch, strategy);
    }

    if git.remote_branch_exists(dir, personal_branch)? {
        info!("remote branch '{}' already exists", personal_branch);
        return reconcile_remote_only(git, dir, source_branch, personal_branch, strategy);
    }

    git.checkout_new(dir, personal_branch)?;
    info!("created personal branch: {}", personal_branch);
    Ok(())
}

fn reconcile_existing_local(
    git: &GitOps<'_>,
    dir: &Path,
    source_branch: &str,
    personal_branch: &str,
    strategy: BranchExistsStrategy,
) -> Result<()> {
    match strategy {
        BranchExistsStrategy::Checkout => {
            git.checkout(dir, personal_branch)?;
            info!("checked out existing branch: {}", personal_branch);
        }
        BranchExistsStrategy::Recreate => {
            git.checkout(dir, source_branch)?;
            git.delete_branch(dir, personal_branch)?;
            git.checkout_new(dir, personal_branch)?;
            info!("recreated branch: {}", personal_branch);
        }
        BranchExistsStrategy::Reset => {
            git.checkout(dir, personal_branch)?;
            git.reset_hard(dir, &format!("origin/{}", source_branch))?;
            info!("reset branch {} to {}", personal_branch, source_branch);
        }
    }
    Ok(())
}

// Recreate has no distinct remote-only behavior; it takes the checkout path.
fn reconcile_remote_only(
    git: &GitOps<'_>,
    dir: &Path,
    source_branch: &str,
    personal_branch: &str,
    strategy: BranchExistsStrategy,
) -> Result<()> {
    git.checkout_tracking(dir, personal_branch)?;
    if strategy == BranchExistsStrategy::Reset {
        git.reset_hard(dir, &format!("origin/{}", source_branch))?;
        info!("checked out remote branch and reset: {}", personal_branch);
    } else {
        info!("checked out remote branch: {}", personal_branch);
    }
    Ok(())
}
