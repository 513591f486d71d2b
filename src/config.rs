//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the JSON run
//! configuration, as well as the logic for loading it. A run configuration
//! names the repositories to process, the personal branch to reconcile, the
//! replacement rules to apply, and the operator commands to execute.
//!
//! ## Parsing
//!
//! `from_file` is the main entry point. Loading happens in three steps:
//!
//! 1.  Parse the file as JSON.
//! 2.  Expand `${VAR}` environment-variable references in every string value.
//! 3.  Deserialize into [`Config`] and validate.
//!
//! ## Legacy shapes
//!
//! Two compatibility surfaces exist and both are normalized exactly once,
//! before any stage logic runs:
//!
//! -   Commands may be bare strings (implying repository scope) or explicit
//!     `{command, scope}` objects. [`normalize_commands`] produces the
//!     canonical [`CommandSpec`] shape.
//! -   Stage-enablement flags may live in the `execution` block (current) or
//!     as `execute_*` keys under `global` (legacy). [`Config::execution_plan`]
//!     resolves them, with the `execution` block taking precedence.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One repository to process. `name` doubles as the working-tree directory
/// name and the statistics key, so it must be unique within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySpec {
    /// Unique repository name within the run.
    pub name: String,
    /// Clone URL (HTTPS or SSH).
    pub url: String,
}

/// How to reconcile a personal branch that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BranchExistsStrategy {
    /// Check out the existing branch as-is, preserving prior local work.
    #[default]
    Checkout,
    /// Delete the local branch and recreate it from the source branch.
    Recreate,
    /// Check out the branch and hard-reset it to the remote source tip.
    Reset,
}

/// Failure policy for commands and repository iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Log the failure and keep going.
    #[default]
    Continue,
    /// Cease processing the remaining items in the current scope.
    Stop,
}

/// A single ordered search/replace rule.
///
/// The rule's position in the `replacements` array is its identity for
/// statistics purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementRule {
    /// Text or pattern to search for. A rule with an empty search is skipped.
    #[serde(default)]
    pub search: String,
    /// Replacement text. May reference capture groups when `is_regex` is set.
    #[serde(default)]
    pub replace: String,
    /// Interpret `search` as a regular expression with multi-line semantics.
    #[serde(default)]
    pub is_regex: bool,
    /// File extensions to restrict the rule to (e.g. `[".txt", ".md"]`).
    /// Empty means all files.
    #[serde(default)]
    pub include_extensions: Vec<String>,
    /// Glob patterns excluding files by path or base name.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Where an operator command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    /// Once per repository, inside that repository's working tree.
    #[default]
    Repo,
    /// Exactly once per run, inside the shared parent working directory.
    Parent,
}

/// A command entry as it appears in the configuration file.
///
/// The bare-string form is the legacy shape; it implies repository scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandEntry {
    /// Legacy shape: a bare command string.
    Bare(String),
    /// Current shape: command with an explicit scope.
    Full {
        command: String,
        #[serde(default)]
        scope: CommandScope,
    },
}

/// The canonical command shape used by all stage logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    pub scope: CommandScope,
}

/// Normalize configured command entries into the canonical shape.
pub fn normalize_commands(entries: &[CommandEntry]) -> Vec<CommandSpec> {
    entries
        .iter()
        .map(|entry| match entry {
            CommandEntry::Bare(command) => CommandSpec {
                command: command.clone(),
                scope: CommandScope::Repo,
            },
            CommandEntry::Full { command, scope } => CommandSpec {
                command: command.clone(),
                scope: *scope,
            },
        })
        .collect()
}

/// Commit message configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Message template. Supports the built-in placeholders `{repo_name}`,
    /// `{date}`, `{datetime}`, `{timestamp}`, `{replacement_count}`,
    /// `{command_count}` plus any key from `variables`.
    pub message: String,
    /// Operator-supplied additional placeholder values.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Global run policy shared by all repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Upstream branch treated as the authoritative baseline.
    #[serde(default = "default_source_branch")]
    pub source_branch: String,
    /// Token for HTTPS authentication, injected into clone/push URLs.
    #[serde(default)]
    pub git_token: Option<String>,
    /// Account name paired with `git_token`.
    #[serde(default)]
    pub git_account: Option<String>,
    #[serde(default)]
    pub branch_exists_strategy: BranchExistsStrategy,
    #[serde(default)]
    pub on_error: OnError,
    /// Directory for the run log file. Logs go to stderr when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    #[serde(default)]
    pub log_level: Option<String>,
    /// Echo captured command output into the log.
    #[serde(default = "default_true")]
    pub show_command_output: bool,
    // Legacy stage-enablement flags; superseded by the `execution` block.
    #[serde(default)]
    pub execute_clone: Option<bool>,
    #[serde(default)]
    pub execute_branch: Option<bool>,
    #[serde(default)]
    pub execute_replacements: Option<bool>,
    #[serde(default)]
    pub execute_commands: Option<bool>,
    #[serde(default)]
    pub execute_commit: Option<bool>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            source_branch: default_source_branch(),
            git_token: None,
            git_account: None,
            branch_exists_strategy: BranchExistsStrategy::default(),
            on_error: OnError::default(),
            log_dir: None,
            log_level: None,
            show_command_output: true,
            execute_clone: None,
            execute_branch: None,
            execute_replacements: None,
            execute_commands: None,
            execute_commit: None,
        }
    }
}

fn default_source_branch() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

/// Per-stage enablement flags as written in the current configuration shape.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub clone: Option<bool>,
    #[serde(default)]
    pub branch: Option<bool>,
    #[serde(default)]
    pub replacements: Option<bool>,
    #[serde(default)]
    pub commands: Option<bool>,
    #[serde(default)]
    pub commit: Option<bool>,
}

/// Resolved stage enablement, after legacy-flag fallback. Every stage
/// defaults to enabled.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionPlan {
    pub clone: bool,
    pub branch: bool,
    pub replacements: bool,
    pub commands: bool,
    pub commit: bool,
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self {
            clone: true,
            branch: true,
            replacements: true,
            commands: true,
            commit: true,
        }
    }
}

/// The complete run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub repositories: Vec<RepositorySpec>,
    /// Working branch created/reused to carry the batch changes.
    pub personal_branch: String,
    pub commit: CommitConfig,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub execution: Option<ExecutionConfig>,
    #[serde(default)]
    pub replacements: Vec<ReplacementRule>,
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

impl Config {
    /// Resolve the per-stage enablement flags.
    ///
    /// The `execution` block wins; `global.execute_*` keys are consulted as a
    /// legacy fallback; anything unspecified is enabled.
    pub fn execution_plan(&self) -> ExecutionPlan {
        let execution = self.execution.unwrap_or_default();
        ExecutionPlan {
            clone: resolve_flag(execution.clone, self.global.execute_clone),
            branch: resolve_flag(execution.branch, self.global.execute_branch),
            replacements: resolve_flag(execution.replacements, self.global.execute_replacements),
            commands: resolve_flag(execution.commands, self.global.execute_commands),
            commit: resolve_flag(execution.commit, self.global.execute_commit),
        }
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.repositories.is_empty() {
            return Err(Error::ConfigParse {
                message: "repositories must not be empty".to_string(),
                hint: Some("add at least one {name, url} entry".to_string()),
            });
        }

        let mut seen = HashSet::new();
        for (idx, repo) in self.repositories.iter().enumerate() {
            if repo.name.is_empty() || repo.url.is_empty() {
                return Err(Error::ConfigParse {
                    message: format!("repository #{} is missing a name or url", idx),
                    hint: None,
                });
            }
            if !seen.insert(repo.name.as_str()) {
                return Err(Error::ConfigParse {
                    message: format!("duplicate repository name: {}", repo.name),
                    hint: Some("repository names key the working tree and statistics".to_string()),
                });
            }
        }

        if self.personal_branch.is_empty() {
            return Err(Error::ConfigParse {
                message: "personal_branch must not be empty".to_string(),
                hint: None,
            });
        }

        Ok(())
    }
}

fn resolve_flag(current: Option<bool>, legacy: Option<bool>) -> bool {
    current.or(legacy).unwrap_or(true)
}

/// Load, expand, deserialize and validate a configuration file.
pub fn from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::ConfigParse {
            message: format!("configuration file not found: {}", path.display()),
            hint: None,
        });
    }

    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse a JSON string into a validated [`Config`].
pub fn parse(json: &str) -> Result<Config> {
    let raw: Value = serde_json::from_str(json)?;
    let expanded = expand_env_vars(raw);
    let config: Config = serde_json::from_value(expanded).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some("required keys: repositories, personal_branch, commit".to_string()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Recursively expand `${VAR}` references in every string value.
///
/// References to undefined variables are left untouched.
fn expand_env_vars(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(expand_env_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(expand_env_vars).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, expand_env_vars(v)))
                .collect(),
        ),
        other => other,
    }
}

fn expand_env_str(input: &str) -> String {
    let pattern = Regex::new(r"\$\{([^}]+)\}").expect("static env-var pattern");
    pattern
        .replace_all(input, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
