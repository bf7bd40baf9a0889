// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Spawn external commands in the foreground or background.
// Author: Lukas Bower

//! Foreground/background process execution.

use std::io::{self, ErrorKind};
use std::process::{Child, Command, ExitStatus};

use hintsh_core::{ParsedCommand, EXEC_FAILED_STATUS};
use log::{debug, warn};

/// Result of dispatching one command.
#[derive(Debug)]
pub enum ExecOutcome {
    /// Foreground child ran to completion.
    Completed(ExitStatus),
    /// Background child was started and left running.
    Detached {
        /// Process identifier of the child.
        pid: u32,
    },
    /// The program could not be executed (missing or not executable).
    ExecFailed,
    /// The child could not be created or waited on.
    Failed,
}

impl ExecOutcome {
    /// Exit status recorded for the command, if any.
    ///
    /// [`ExecOutcome::ExecFailed`] maps to 127.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Completed(status) => status.code(),
            Self::ExecFailed => Some(EXEC_FAILED_STATUS),
            Self::Detached { .. } | Self::Failed => None,
        }
    }
}

/// Background child that has terminated.
#[derive(Debug)]
pub struct FinishedJob {
    /// Process identifier of the child.
    pub pid: u32,
    /// Exit status reported by the OS.
    pub status: ExitStatus,
}

/// Spawns children and tracks background jobs until they are reaped.
#[derive(Debug, Default)]
pub struct ProcessExecutor {
    jobs: Vec<Child>,
}

impl ProcessExecutor {
    /// Create an executor with no background jobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `command`, waiting for it unless it was marked for background execution.
    pub fn execute(&mut self, command: &ParsedCommand) -> ExecOutcome {
        let program = command.program();
        let mut child = match build_command(command).spawn() {
            Ok(child) => child,
            Err(err) if is_resource_exhaustion(&err) => {
                eprintln!("hintsh: fork failed: {err}");
                return ExecOutcome::Failed;
            }
            Err(err) => {
                eprintln!("hintsh: exec failed for {program}: {err}");
                return ExecOutcome::ExecFailed;
            }
        };

        if command.background() {
            let pid = child.id();
            debug!("started background job {pid} ({program})");
            self.jobs.push(child);
            return ExecOutcome::Detached { pid };
        }

        match child.wait() {
            Ok(status) => {
                debug!("{program} exited with {status}");
                ExecOutcome::Completed(status)
            }
            Err(err) => {
                eprintln!("hintsh: waitpid: {err}");
                ExecOutcome::Failed
            }
        }
    }

    /// Collect background jobs that have exited, without blocking.
    pub fn reap_finished(&mut self) -> Vec<FinishedJob> {
        let mut finished = Vec::new();
        self.jobs.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                finished.push(FinishedJob {
                    pid: child.id(),
                    status,
                });
                false
            }
            Ok(None) => true,
            Err(err) => {
                warn!("dropping background job {}: {err}", child.id());
                false
            }
        });
        finished
    }

    /// Number of background jobs not yet reaped.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }
}

fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::OutOfMemory)
}

fn build_command(parsed: &ParsedCommand) -> Command {
    let mut command = Command::new(parsed.program());
    command.args(parsed.args());
    restore_default_signals(&mut command);
    command
}

/// Reset SIGINT and SIGQUIT to their default dispositions in the child.
#[cfg(unix)]
#[allow(unsafe_code)]
fn restore_default_signals(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: the hook runs between fork and exec and only calls signal(2),
    // which is async-signal-safe.
    unsafe {
        command.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn restore_default_signals(_command: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use hintsh_core::parse_line;
    use serial_test::serial;
    use std::os::unix::process::ExitStatusExt;
    use std::thread;
    use std::time::{Duration, Instant};

    fn parsed(line: &str) -> ParsedCommand {
        parse_line(line).unwrap()
    }

    #[test]
    fn foreground_waits_for_exit() {
        let mut executor = ProcessExecutor::new();
        let started = Instant::now();
        let outcome = executor.execute(&parsed("sleep 0.3"));
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(outcome.exit_code(), Some(0));
    }

    #[test]
    fn records_child_exit_status() {
        let mut executor = ProcessExecutor::new();
        let outcome = executor.execute(&parsed("true"));
        assert!(matches!(outcome, ExecOutcome::Completed(status) if status.success()));
        let outcome = executor.execute(&parsed("false"));
        assert_eq!(outcome.exit_code(), Some(1));
    }

    #[test]
    fn missing_program_reports_127() {
        let mut executor = ProcessExecutor::new();
        let outcome = executor.execute(&parsed("hintsh-definitely-missing-binary --flag"));
        assert!(matches!(outcome, ExecOutcome::ExecFailed));
        assert_eq!(outcome.exit_code(), Some(127));
    }

    #[test]
    fn background_returns_without_waiting() {
        let mut executor = ProcessExecutor::new();
        let started = Instant::now();
        let outcome = executor.execute(&parsed("sleep 2 &"));
        assert!(started.elapsed() < Duration::from_secs(1));
        let ExecOutcome::Detached { pid } = outcome else {
            panic!("expected detached outcome, got {outcome:?}");
        };
        assert!(pid > 0);
        assert_eq!(executor.pending_jobs(), 1);
        assert!(executor.reap_finished().is_empty());
    }

    #[test]
    fn finished_background_jobs_are_reaped() {
        let mut executor = ProcessExecutor::new();
        let ExecOutcome::Detached { pid } = executor.execute(&parsed("true &")) else {
            panic!("expected detached outcome");
        };
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut reaped = Vec::new();
        while reaped.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
            reaped = executor.reap_finished();
        }
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].pid, pid);
        assert!(reaped[0].status.success());
        assert_eq!(executor.pending_jobs(), 0);
    }

    #[test]
    #[serial]
    #[allow(unsafe_code)]
    fn children_get_default_sigint_when_shell_ignores_it() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("self_interrupt.sh");
        std::fs::write(&script, "kill -INT $$\nexit 0\n").unwrap();

        // SAFETY: only the disposition is swapped, and it is restored below.
        let previous = unsafe { libc::signal(libc::SIGINT, libc::SIG_IGN) };
        let mut executor = ProcessExecutor::new();
        let outcome = executor.execute(&parsed(&format!("sh {}", script.display())));
        // SAFETY: as above.
        unsafe { libc::signal(libc::SIGINT, previous) };

        let ExecOutcome::Completed(status) = outcome else {
            panic!("expected completed outcome, got {outcome:?}");
        };
        assert_eq!(status.signal(), Some(libc::SIGINT), "{status:?}");
    }
}
