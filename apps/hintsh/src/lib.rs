// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Interactive shell loop with suggestion lookups and SQLite history.
// Author: Lukas Bower
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Interactive shell with an out-of-process suggestion oracle.
//!
//! Every line goes through the same sequence: suggestion lookup, history
//! insert, then dispatch to a builtin or a child process. Only `exit` and end
//! of input stop the loop; suggestion, history and spawn failures are
//! reported and the next prompt is printed.

pub mod config;
pub mod exec;
pub mod history;
pub mod suggest;
pub mod transport;

use std::env;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use hintsh_core::{parse_line, Builtin, ParsedCommand, DEFAULT_HISTORY_LIMIT, DEFAULT_PROMPT};
use log::warn;

pub use config::{ConfigOverrides, ShellConfig};
pub use exec::{ExecOutcome, ProcessExecutor};
pub use history::{HistoryRecord, HistoryStore};
pub use suggest::{NoSuggestions, SuggestionClient, SuggestionSource};
pub use transport::{Transport, TransportError};

/// Result of executing a single shell command.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandStatus {
    /// Continue reading commands.
    Continue,
    /// Exit the shell loop.
    Quit,
}

/// Shell driver owning the suggestion source, history store and executor.
pub struct Shell<S: SuggestionSource, W: Write> {
    suggestions: S,
    history: HistoryStore,
    executor: ProcessExecutor,
    writer: W,
    prompt: String,
    history_limit: usize,
    last_status: Option<i32>,
}

impl<S: SuggestionSource, W: Write> Shell<S, W> {
    /// Create a new shell.
    pub fn new(suggestions: S, history: HistoryStore, writer: W) -> Self {
        Self {
            suggestions,
            history,
            executor: ProcessExecutor::new(),
            writer,
            prompt: DEFAULT_PROMPT.to_owned(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            last_status: None,
        }
    }

    /// Replace the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Rows printed by `history` without an argument.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Borrow the history store.
    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Exit status of the most recent foreground command.
    #[must_use]
    pub fn last_status(&self) -> Option<i32> {
        self.last_status
    }

    /// Run an interactive loop against stdin.
    pub fn repl(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let reader = stdin.lock();
        self.run(reader)
    }

    /// Read and execute lines until EOF or `exit`.
    pub fn run<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut line = String::new();
        loop {
            self.report_finished_jobs()?;
            write!(self.writer, "{}", self.prompt)?;
            self.writer.flush()?;
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    writeln!(self.writer)?;
                    break;
                }
                Ok(_) => {}
                Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::InvalidData) => {
                    warn!("skipping unreadable input line: {err}");
                    continue;
                }
                Err(err) => return Err(err).context("failed to read command line"),
            }
            if self.execute(&line)? == CommandStatus::Quit {
                break;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Execute a single command line.
    pub fn execute(&mut self, line: &str) -> Result<CommandStatus> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(CommandStatus::Continue);
        }
        if let Some(suggestion) = self.suggestions.suggest(line) {
            if let Err(err) = writeln!(self.writer, "\t[suggestion] {suggestion}") {
                warn!("failed to echo suggestion: {err}");
            }
        }
        let Some(parsed) = parse_line(line) else {
            return Ok(CommandStatus::Continue);
        };
        match parsed.builtin() {
            Some(Builtin::Exit) => Ok(CommandStatus::Quit),
            Some(Builtin::Cd) => {
                self.history.append(line);
                change_directory(parsed.args().first().map(String::as_str));
                Ok(CommandStatus::Continue)
            }
            Some(Builtin::History) => {
                self.history.append(line);
                self.print_history(parsed.args().first().map(String::as_str))?;
                Ok(CommandStatus::Continue)
            }
            None => {
                self.history.append(line);
                self.launch(&parsed)?;
                Ok(CommandStatus::Continue)
            }
        }
    }

    /// Close the history store and return the writer.
    pub fn shutdown(self) -> W {
        self.history.close();
        self.writer
    }

    /// Consume the shell and return its parts.
    pub fn into_parts(self) -> (S, HistoryStore, W) {
        (self.suggestions, self.history, self.writer)
    }

    fn launch(&mut self, parsed: &ParsedCommand) -> Result<()> {
        // Child output must land after anything already printed.
        self.writer.flush()?;
        match self.executor.execute(parsed) {
            ExecOutcome::Detached { pid } => {
                writeln!(self.writer, "[bg] pid {pid}")?;
            }
            outcome => self.last_status = outcome.exit_code(),
        }
        Ok(())
    }

    fn print_history(&mut self, count: Option<&str>) -> Result<()> {
        let limit = match count {
            None => i64::try_from(self.history_limit).unwrap_or(i64::MAX),
            Some(raw) => match raw.parse::<i64>() {
                Ok(limit) => limit,
                Err(_) => {
                    eprintln!("history: invalid count '{raw}'");
                    return Ok(());
                }
            },
        };
        for record in self.history.recent(limit) {
            writeln!(self.writer, "{record}")?;
        }
        Ok(())
    }

    fn report_finished_jobs(&mut self) -> Result<()> {
        for job in self.executor.reap_finished() {
            writeln!(self.writer, "[bg] pid {} done ({})", job.pid, job.status)?;
        }
        Ok(())
    }
}

fn change_directory(target: Option<&str>) {
    let target = match target {
        Some(dir) => PathBuf::from(dir),
        None => match env::var_os("HOME") {
            Some(home) => PathBuf::from(home),
            None => {
                eprintln!("cd: HOME not set");
                return;
            }
        },
    };
    if let Err(err) = env::set_current_dir(&target) {
        eprintln!("cd: {}: {err}", target.display());
    }
}
