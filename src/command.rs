//! # Operator Command Execution
//!
//! Runs operator-supplied shell commands at two scopes: once per repository
//! inside its working tree, or once per run inside the shared parent
//! directory. Every command gets a hard timeout; stdout and stderr are
//! captured separately and echoed into the log.
//!
//! A non-zero exit status, a timeout and a launch failure all count as the
//! same thing to the caller: one failed command. Under the `Stop` failure
//! policy the remaining commands in the current scope are neither run nor
//! counted.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{CommandScope, CommandSpec, OnError};
use log::{error, info, warn};

/// Hard per-command timeout.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Executes scoped operator commands under a failure policy.
pub struct CommandRunner {
    on_error: OnError,
    show_output: bool,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(on_error: OnError, show_output: bool) -> Self {
        Self {
            on_error,
            show_output,
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the repository-scoped commands inside `dir`.
    ///
    /// Returns `(successes, failures)` over the commands actually attempted.
    pub fn run_repo_scoped(&self, dir: &Path, commands: &[CommandSpec]) -> (usize, usize) {
        self.run_scope(dir, CommandScope::Repo, commands)
    }

    /// Run the parent-scoped commands once, inside the shared parent
    /// working directory.
    pub fn run_parent_scoped(&self, dir: &Path, commands: &[CommandSpec]) -> (usize, usize) {
        self.run_scope(dir, CommandScope::Parent, commands)
    }

    fn run_scope(
        &self,
        dir: &Path,
        scope: CommandScope,
        commands: &[CommandSpec],
    ) -> (usize, usize) {
        let scoped: Vec<&CommandSpec> = commands.iter().filter(|c| c.scope == scope).collect();
        if scoped.is_empty() {
            return (0, 0);
        }

        info!(
            "executing {} command(s) in {}",
            scoped.len(),
            dir.display()
        );

        let mut successes = 0;
        let mut failures = 0;
        for spec in scoped {
            if self.run_single(dir, &spec.command) {
                successes += 1;
            } else {
                failures += 1;
                if self.on_error == OnError::Stop {
                    error!("command failed, aborting remaining commands");
                    break;
                }
            }
        }
        (successes, failures)
    }

    /// Run one command through the shell with the configured timeout.
    pub fn run_single(&self, dir: &Path, command: &str) -> bool {
        info!("running command: {}", command);

        let mut child = match shell_command(command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                error!("command failed to launch: {}", e);
                return false;
            }
        };

        let stdout_pipe = child.stdout.take();
        let stdout_handle = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        });
        let stderr_pipe = child.stderr.take();
        let stderr_handle = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Some(status),
                Ok(None) => {}
                Err(e) => {
                    error!("could not poll command: {}", e);
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
            }
            if Instant::now() >= deadline {
                error!("command timed out: {}", command);
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();

        if self.show_output {
            if !stdout.trim().is_empty() {
                let lines: Vec<&str> = stdout.trim().lines().collect();
                info!("command output ({} lines):", lines.len());
                for line in &lines {
                    info!("  {}", line);
                }
            }
            if !stderr.trim().is_empty() {
                let lines: Vec<&str> = stderr.trim().lines().collect();
                warn!("command error output ({} lines):", lines.len());
                for line in &lines {
                    warn!("  {}", line);
                }
            }
        }

        match status {
            Some(status) if status.success() => {
                info!("command succeeded (exit code: 0)");
                true
            }
            Some(status) => {
                error!("command failed (exit code: {:?})", status.code());
                false
            }
            None => false,
        }
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(command: &str) -> CommandSpec {
        CommandSpec {
            command: command.to_string(),
            scope: CommandScope::Repo,
        }
    }

    fn parent(command: &str) -> CommandSpec {
        CommandSpec {
            command: command.to_string(),
            scope: CommandScope::Parent,
        }
    }

    #[test]
    fn test_run_single_success() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Continue, false);
        assert!(runner.run_single(temp.path(), "echo hello"));
    }

    #[test]
    fn test_run_single_nonzero_exit() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Continue, false);
        assert!(!runner.run_single(temp.path(), "exit 3"));
    }

    #[test]
    fn test_run_single_timeout() {
        let temp = TempDir::new().unwrap();
        let runner =
            CommandRunner::new(OnError::Continue, false).with_timeout(Duration::from_millis(100));

        let start = Instant::now();
        assert!(!runner.run_single(temp.path(), "sleep 5"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_run_single_runs_in_given_directory() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Continue, false);
        assert!(runner.run_single(temp.path(), "touch marker"));
        assert!(temp.path().join("marker").exists());
    }

    #[test]
    fn test_stop_policy_halts_after_first_failure() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Stop, false);
        let commands = vec![repo("touch first"), repo("exit 1"), repo("touch third")];

        let (successes, failures) = runner.run_repo_scoped(temp.path(), &commands);

        assert_eq!((successes, failures), (1, 1));
        assert!(temp.path().join("first").exists());
        assert!(!temp.path().join("third").exists());
    }

    #[test]
    fn test_continue_policy_attempts_every_command() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Continue, false);
        let commands = vec![repo("touch first"), repo("exit 1"), repo("touch third")];

        let (successes, failures) = runner.run_repo_scoped(temp.path(), &commands);

        assert_eq!((successes, failures), (2, 1));
        assert!(temp.path().join("third").exists());
    }

    #[test]
    fn test_scope_filtering() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Continue, false);
        let commands = vec![repo("touch repo-marker"), parent("touch parent-marker")];

        let (successes, failures) = runner.run_parent_scoped(temp.path(), &commands);

        assert_eq!((successes, failures), (1, 0));
        assert!(temp.path().join("parent-marker").exists());
        assert!(!temp.path().join("repo-marker").exists());
    }

    #[test]
    fn test_empty_scope_is_noop() {
        let temp = TempDir::new().unwrap();
        let runner = CommandRunner::new(OnError::Continue, false);
        let commands = vec![parent("touch parent-marker")];

        assert_eq!(runner.run_repo_scoped(temp.path(), &commands), (0, 0));
        assert!(!temp.path().join("parent-marker").exists());
    }
}
