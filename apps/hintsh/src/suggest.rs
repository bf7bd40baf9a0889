// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Best-effort suggestion lookups with Unix-socket then TCP fallback.
// Author: Lukas Bower

//! Best-effort suggestion lookups.
//!
//! Every failure is swallowed: callers only ever see `Some(line)` or `None`,
//! and `None` means the same thing as "the service had nothing to say".

use std::path::PathBuf;
use std::time::Duration;

use hintsh_core::{
    SuggestionRequest, DEFAULT_MODEL, DEFAULT_SOCKET_PATH, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT,
    DEFAULT_TIMEOUT_MS,
};
use log::debug;

use crate::transport::{Deadline, Transport};

/// Source of suggestion lines for the shell loop.
pub trait SuggestionSource {
    /// Return the raw response for `prefix`, or `None` if nothing arrived in time.
    fn suggest(&mut self, prefix: &str) -> Option<String>;
}

impl<T: SuggestionSource + ?Sized> SuggestionSource for Box<T> {
    fn suggest(&mut self, prefix: &str) -> Option<String> {
        (**self).suggest(prefix)
    }
}

/// Source used when suggestions are switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSuggestions;

impl SuggestionSource for NoSuggestions {
    fn suggest(&mut self, _prefix: &str) -> Option<String> {
        None
    }
}

/// Client for the out-of-process suggestion service.
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    socket_path: Option<PathBuf>,
    tcp_host: String,
    tcp_port: u16,
    model: String,
    timeout: Duration,
}

impl Default for SuggestionClient {
    fn default() -> Self {
        Self::new(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
            .with_socket_path(Some(PathBuf::from(DEFAULT_SOCKET_PATH)))
    }
}

impl SuggestionClient {
    /// Client that only knows the TCP endpoint.
    pub fn new(tcp_host: impl Into<String>, tcp_port: u16) -> Self {
        Self {
            socket_path: None,
            tcp_host: tcp_host.into(),
            tcp_port,
            model: DEFAULT_MODEL.to_owned(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Try a Unix-domain socket at `path` before TCP; `None` skips it.
    #[must_use]
    pub fn with_socket_path(mut self, path: Option<PathBuf>) -> Self {
        self.socket_path = path;
        self
    }

    /// Model identifier sent with every request.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Configured per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Transports in the order they are attempted.
    #[must_use]
    pub fn transports(&self) -> Vec<Transport> {
        let mut transports = Vec::with_capacity(2);
        if cfg!(unix) {
            if let Some(path) = &self.socket_path {
                transports.push(Transport::UnixSocket(path.clone()));
            }
        }
        transports.push(Transport::Tcp {
            host: self.tcp_host.clone(),
            port: self.tcp_port,
        });
        transports
    }

    /// Ask the service about `prefix`, trying each transport once.
    ///
    /// All attempts share one deadline `timeout` from now; the first response
    /// wins and later transports are skipped once it has passed.
    pub fn fetch_suggestion(&self, prefix: &str, model: &str, timeout: Duration) -> Option<String> {
        if prefix.is_empty() {
            return None;
        }
        let request = SuggestionRequest::new(prefix, model).to_line();
        let deadline = Deadline::after(timeout);
        for transport in self.transports() {
            if deadline.remaining().is_none() {
                debug!("suggestion deadline passed before {transport}");
                break;
            }
            match transport.exchange(&request, deadline) {
                Ok(response) => {
                    debug!("suggestion via {transport}: {} bytes", response.len());
                    return Some(response);
                }
                Err(err) => debug!("suggestion via {transport} failed: {err}"),
            }
        }
        None
    }
}

impl SuggestionSource for SuggestionClient {
    fn suggest(&mut self, prefix: &str) -> Option<String> {
        self.fetch_suggestion(prefix, &self.model, self.timeout)
    }
}
