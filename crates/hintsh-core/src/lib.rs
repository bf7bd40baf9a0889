// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shared hintsh command grammar and suggestion wire primitives.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared hintsh command grammar and suggestion wire primitives used by the
//! shell loop, the suggestion client, and host tooling.
//!
//! Nothing in this crate performs I/O. Tokenization, builtin recognition and
//! request rendering are kept here so they can be tested without sockets or
//! child processes.

pub mod command;
pub mod wire;

pub use command::{parse_line, Builtin, ParsedCommand, BACKGROUND_TOKEN};
pub use wire::{
    escape_json_str, frame_response, render_request, SuggestionRequest, MAX_RESPONSE_LEN,
};

/// Well-known Unix-domain socket path served by the suggestion service.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/shell_suggest.sock";

/// Loopback host used for the TCP fallback transport.
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// TCP port used for the fallback transport.
pub const DEFAULT_TCP_PORT: u16 = 9999;

/// Model identifier sent when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "default";

/// Interactive suggestion timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 150;

/// SQLite history file, relative to the shell's working directory.
pub const DEFAULT_HISTORY_PATH: &str = "commands.db";

/// Number of rows printed by `history` when no count is supplied.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Prompt printed before each line is read.
pub const DEFAULT_PROMPT: &str = "hsh> ";

/// Exit status reported when a command cannot be executed.
pub const EXEC_FAILED_STATUS: i32 = 127;
