// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Whitespace command tokenizer and builtin classification for hintsh.
// Author: Lukas Bower

//! Whitespace command tokenizer and builtin classification for hintsh.

use core::fmt;

/// Token that marks a command for background execution.
pub const BACKGROUND_TOKEN: &str = "&";

/// Commands handled inside the shell process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Leave the shell loop.
    Exit,
    /// Change the working directory.
    Cd,
    /// Print recent history rows.
    History,
}

impl Builtin {
    /// Every builtin, in help order.
    pub const ALL: [Builtin; 3] = [Builtin::Exit, Builtin::Cd, Builtin::History];

    /// Resolve a command name to a builtin.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exit" => Some(Self::Exit),
            "cd" => Some(Self::Cd),
            "history" => Some(Self::History),
            _ => None,
        }
    }

    /// Name typed by the user.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Cd => "cd",
            Self::History => "history",
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Argument vector derived from a command line.
///
/// `tokens` is never empty and never holds an empty string; `&` tokens are
/// consumed into the `background` flag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    tokens: Vec<String>,
    background: bool,
}

impl ParsedCommand {
    /// Program name (`argv[0]`).
    #[must_use]
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    /// Arguments after the program name.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// Full argument vector including the program name.
    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the command was suffixed (or interleaved) with `&`.
    #[must_use]
    pub fn background(&self) -> bool {
        self.background
    }

    /// Builtin named by the first token, if any.
    #[must_use]
    pub fn builtin(&self) -> Option<Builtin> {
        Builtin::from_name(self.program())
    }
}

/// Tokenize a command line.
///
/// Returns `None` when the line holds no tokens other than `&`.
#[must_use]
pub fn parse_line(line: &str) -> Option<ParsedCommand> {
    let mut background = false;
    let mut tokens = Vec::new();
    for token in line.split([' ', '\t', '\r', '\n']) {
        if token.is_empty() {
            continue;
        }
        if token == BACKGROUND_TOKEN {
            background = true;
        } else {
            tokens.push(token.to_owned());
        }
    }
    if tokens.is_empty() {
        return None;
    }
    Some(ParsedCommand { tokens, background })
}
