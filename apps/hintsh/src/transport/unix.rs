// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Unix-domain socket transport backend for the suggestion service.
// Author: Lukas Bower

//! Unix-domain socket transport backend for the suggestion service.

use std::io;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use super::{round_trip, Deadline, TimedStream, TransportError};

impl TimedStream for UnixStream {
    fn limit_reads(&self, limit: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(limit))
    }

    fn limit_writes(&self, limit: Duration) -> io::Result<()> {
        self.set_write_timeout(Some(limit))
    }
}

/// Perform one request/response exchange over a Unix-domain socket.
///
/// `connect(2)` on a Unix socket has no timeout; a listener with a full
/// backlog can hold it past the deadline, which is then reported as a timeout.
pub fn exchange(path: &Path, request: &str, deadline: Deadline) -> Result<String, TransportError> {
    deadline.remaining().ok_or_else(|| deadline.expired())?;
    let mut stream = UnixStream::connect(path).map_err(TransportError::Connect)?;
    deadline.remaining().ok_or_else(|| deadline.expired())?;
    round_trip(&mut stream, request, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixListener;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn exchanges_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suggest.sock");
        let listener = UnixListener::bind(&path).unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            stream.write_all(b"{\"suggestions\":[]}\n").unwrap();
        });

        let deadline = Deadline::after(Duration::from_secs(2));
        let response = exchange(&path, "{\"cmd\": \"ls\"}\n", deadline).unwrap();
        assert_eq!(response, "{\"suggestions\":[]}");
    }

    #[test]
    fn missing_socket_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sock");
        let deadline = Deadline::after(Duration::from_millis(150));
        let err = exchange(&path, "{}\n", deadline).unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
    }

    #[test]
    fn expired_deadline_skips_the_connect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idle.sock");
        let listener = UnixListener::bind(&path).unwrap();
        listener.set_nonblocking(true).unwrap();
        let err = exchange(&path, "{}\n", Deadline::after(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        assert!(listener.accept().is_err());
    }

    #[test]
    fn silent_server_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let holder = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(600));
            drop(stream);
        });

        let started = Instant::now();
        let deadline = Deadline::after(Duration::from_millis(100));
        let err = exchange(&path, "{}\n", deadline).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_millis(400));
        holder.join().unwrap();
    }
}
