// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Deadline-bounded request/response transports for the suggestion service.
// Author: Lukas Bower

//! Transport backends for the suggestion service.
//!
//! Each backend performs one exchange per connection: write a single request
//! line, then read until the first newline or until the deadline passes.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use hintsh_core::{frame_response, MAX_RESPONSE_LEN};
use thiserror::Error;

pub mod tcp;
#[cfg(unix)]
pub mod unix;

/// Errors raised while talking to the suggestion service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport does not exist on this platform.
    #[error("transport unavailable on this platform")]
    Unavailable,
    /// The endpoint did not resolve to any address.
    #[error("no addresses resolved for {0}")]
    Resolve(String),
    /// Connecting to the endpoint failed.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    /// Writing the request failed.
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
    /// Reading the response failed.
    #[error("failed to read response: {0}")]
    Recv(#[source] io::Error),
    /// The deadline passed before any response byte arrived.
    #[error("no response within {0:?}")]
    Timeout(Duration),
    /// The peer closed the connection without sending a response.
    #[error("connection closed before a response arrived")]
    Closed,
}

/// Endpoint for a single suggestion exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Unix-domain stream socket at a filesystem path.
    UnixSocket(PathBuf),
    /// TCP stream to a host and port.
    Tcp {
        /// Hostname or address.
        host: String,
        /// TCP port.
        port: u16,
    },
}

impl Transport {
    /// Send `request` (already newline terminated) and return the response line.
    ///
    /// Every blocking step is bounded by `deadline`. Name resolution and the
    /// Unix-domain connect cannot be interrupted, so they are only checked
    /// against it before and after.
    pub fn exchange(&self, request: &str, deadline: Deadline) -> Result<String, TransportError> {
        match self {
            #[cfg(unix)]
            Self::UnixSocket(path) => unix::exchange(path, request, deadline),
            #[cfg(not(unix))]
            Self::UnixSocket(_) => Err(TransportError::Unavailable),
            Self::Tcp { host, port } => tcp::exchange(host, *port, request, deadline),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnixSocket(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp { host, port } => write!(f, "tcp:{host}:{port}"),
        }
    }
}

/// Wall-clock deadline shared by every step of an exchange.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            expires: Instant::now() + budget,
            budget,
        }
    }

    /// Time left, or `None` once the deadline has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let left = self.expires.saturating_duration_since(Instant::now());
        if left.is_zero() {
            None
        } else {
            Some(left)
        }
    }

    /// Total budget the deadline was created with.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    fn expired(&self) -> TransportError {
        TransportError::Timeout(self.budget)
    }
}

/// Stream whose blocking reads and writes can be capped.
pub trait TimedStream: Read + Write {
    /// Cap the next blocking read.
    fn limit_reads(&self, limit: Duration) -> io::Result<()>;

    /// Cap the next blocking write.
    fn limit_writes(&self, limit: Duration) -> io::Result<()>;
}

/// Write the request line and read the response line within `deadline`.
pub(crate) fn round_trip<S: TimedStream>(
    stream: &mut S,
    request: &str,
    deadline: Deadline,
) -> Result<String, TransportError> {
    let limit = deadline.remaining().ok_or_else(|| deadline.expired())?;
    stream.limit_writes(limit).map_err(TransportError::Send)?;
    stream
        .write_all(request.as_bytes())
        .map_err(TransportError::Send)?;
    stream.flush().map_err(TransportError::Send)?;
    read_response(stream, deadline)
}

/// Read one response line.
///
/// Partial data is accumulated up to [`MAX_RESPONSE_LEN`]; if the deadline
/// passes after some bytes arrived, those bytes are returned.
pub(crate) fn read_response<S: TimedStream>(
    stream: &mut S,
    deadline: Deadline,
) -> Result<String, TransportError> {
    let mut buffer = Vec::with_capacity(256);
    let mut chunk = [0u8; 512];
    let mut closed = false;
    while let Some(limit) = deadline.remaining() {
        stream.limit_reads(limit).map_err(TransportError::Recv)?;
        match stream.read(&mut chunk) {
            Ok(0) => {
                closed = true;
                break;
            }
            Ok(read) => {
                let room = MAX_RESPONSE_LEN - buffer.len();
                let kept = &chunk[..read.min(room)];
                buffer.extend_from_slice(kept);
                if kept.contains(&b'\n') || buffer.len() >= MAX_RESPONSE_LEN {
                    break;
                }
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                break;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Recv(err)),
        }
    }
    match frame_response(&buffer) {
        Some(line) => Ok(line),
        None if closed => Err(TransportError::Closed),
        None => Err(deadline.expired()),
    }
}
