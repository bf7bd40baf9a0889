// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Newline-delimited JSON request and response framing for the suggestion service.
// Author: Lukas Bower

//! Newline-delimited JSON framing for the suggestion service.
//!
//! A request is exactly one line: `{"cmd": "...", "model": "..."}` followed by
//! `\n`. The response is one opaque JSON line which is never deserialized here.

use core::fmt::Write;

/// Upper bound on the number of response bytes kept by a client.
pub const MAX_RESPONSE_LEN: usize = 4096;

/// Suggestion lookup sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionRequest<'a> {
    /// Raw command-line prefix as typed.
    pub cmd: &'a str,
    /// Model identifier requested from the service.
    pub model: &'a str,
}

impl<'a> SuggestionRequest<'a> {
    /// Construct a request for `cmd` against `model`.
    #[must_use]
    pub fn new(cmd: &'a str, model: &'a str) -> Self {
        Self { cmd, model }
    }

    /// Render the request as a single newline-terminated line.
    #[must_use]
    pub fn to_line(&self) -> String {
        render_request(self.cmd, self.model)
    }
}

/// Render `{"cmd": ..., "model": ...}` plus the trailing newline.
#[must_use]
pub fn render_request(cmd: &str, model: &str) -> String {
    let mut line = String::with_capacity(cmd.len() + model.len() + 24);
    line.push_str("{\"cmd\": \"");
    push_escaped(&mut line, cmd);
    line.push_str("\", \"model\": \"");
    push_escaped(&mut line, model);
    line.push_str("\"}\n");
    line
}

/// Escape a string for embedding inside a JSON string literal.
///
/// Quote, backslash and newline use their short escapes. Carriage return gets
/// `\r` and the remaining C0 controls get `\u00XX` so the rendered line stays
/// valid JSON; everything else passes through untouched.
#[must_use]
pub fn escape_json_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    push_escaped(&mut out, input);
    out
}

fn push_escaped(out: &mut String, input: &str) {
    for ch in input.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                // Writing into a String cannot fail.
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Extract the payload line from raw response bytes.
///
/// Keeps everything before the first `\n`, drops a trailing `\r`, and returns
/// `None` when nothing is left.
#[must_use]
pub fn frame_response(raw: &[u8]) -> Option<String> {
    let end = raw.iter().position(|b| *b == b'\n').unwrap_or(raw.len());
    let line = &raw[..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(line).into_owned())
}
