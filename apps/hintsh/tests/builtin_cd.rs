// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate the cd builtin against the process working directory.
// Author: Lukas Bower

use std::env;
use std::path::PathBuf;

use hintsh::{CommandStatus, HistoryStore, NoSuggestions, Shell};
use serial_test::serial;

/// Restores the working directory and HOME when a test finishes.
struct CwdGuard {
    cwd: PathBuf,
    home: Option<std::ffi::OsString>,
}

impl CwdGuard {
    fn capture() -> Self {
        Self {
            cwd: env::current_dir().unwrap(),
            home: env::var_os("HOME"),
        }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.cwd);
        match &self.home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
    }
}

fn shell() -> Shell<NoSuggestions, Vec<u8>> {
    Shell::new(NoSuggestions, HistoryStore::in_memory(), Vec::new())
}

fn logged(shell: Shell<NoSuggestions, Vec<u8>>) -> Vec<String> {
    let (_source, history, _output) = shell.into_parts();
    history.recent(10).into_iter().map(|record| record.cmd).collect()
}

#[test]
#[serial]
fn cd_changes_the_shell_directory() {
    let _guard = CwdGuard::capture();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().canonicalize().unwrap();
    let mut shell = shell();

    let line = format!("cd {}", target.display());
    assert_eq!(shell.execute(&line).unwrap(), CommandStatus::Continue);
    assert_eq!(env::current_dir().unwrap().canonicalize().unwrap(), target);
    assert_eq!(logged(shell), vec![line]);
}

#[test]
#[serial]
fn bare_cd_goes_home() {
    let _guard = CwdGuard::capture();
    let home = tempfile::tempdir().unwrap();
    let target = home.path().canonicalize().unwrap();
    env::set_var("HOME", &target);
    let mut shell = shell();

    shell.execute("cd").unwrap();
    assert_eq!(env::current_dir().unwrap().canonicalize().unwrap(), target);
    assert_eq!(logged(shell), vec!["cd".to_owned()]);
}

#[test]
#[serial]
fn failed_cd_keeps_directory_and_is_still_logged() {
    let _guard = CwdGuard::capture();
    let dir = tempfile::tempdir().unwrap();
    let start = dir.path().canonicalize().unwrap();
    env::set_current_dir(&start).unwrap();
    let mut shell = shell();

    let line = "cd does-not-exist";
    assert_eq!(shell.execute(line).unwrap(), CommandStatus::Continue);
    assert_eq!(env::current_dir().unwrap().canonicalize().unwrap(), start);
    assert_eq!(logged(shell), vec![line.to_owned()]);
}
