// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: TCP transport backend for the suggestion service.
// Author: Lukas Bower

//! TCP transport backend for the suggestion service.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{round_trip, Deadline, TimedStream, TransportError};

impl TimedStream for TcpStream {
    fn limit_reads(&self, limit: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(limit))
    }

    fn limit_writes(&self, limit: Duration) -> io::Result<()> {
        self.set_write_timeout(Some(limit))
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    (host, port)
        .to_socket_addrs()
        .map_err(TransportError::Connect)?
        .next()
        .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))
}

/// Open a connection, bounding the connect by the deadline.
///
/// Resolution of a host name blocks without a timeout; a slow resolver eats
/// into the deadline and the connect is then skipped.
pub fn connect(host: &str, port: u16, deadline: Deadline) -> Result<TcpStream, TransportError> {
    deadline.remaining().ok_or_else(|| deadline.expired())?;
    let address = resolve(host, port)?;
    let limit = deadline.remaining().ok_or_else(|| deadline.expired())?;
    let stream = TcpStream::connect_timeout(&address, limit).map_err(TransportError::Connect)?;
    // Request lines are tiny; don't let Nagle hold them back.
    let _ = stream.set_nodelay(true);
    Ok(stream)
}

/// Perform one request/response exchange over TCP.
pub fn exchange(
    host: &str,
    port: u16,
    request: &str,
    deadline: Deadline,
) -> Result<String, TransportError> {
    let mut stream = connect(host, port, deadline)?;
    round_trip(&mut stream, request, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn exchanges_one_line() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            writeln!(stream, "{{\"echo\":{}}}", line.trim_end()).unwrap();
            line
        });

        let deadline = Deadline::after(Duration::from_secs(2));
        let response = exchange("127.0.0.1", port, "{\"cmd\": \"ls\"}\n", deadline).unwrap();
        assert_eq!(response, "{\"echo\":{\"cmd\": \"ls\"}}");
        assert_eq!(server.join().unwrap(), "{\"cmd\": \"ls\"}\n");
    }

    #[test]
    fn expired_deadline_skips_the_connect() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();
        let expired = Deadline::after(Duration::ZERO);
        let err = exchange("127.0.0.1", port, "{}\n", expired).unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        assert!(listener.accept().is_err());
    }

    #[test]
    fn refused_connection_is_a_connect_error() {
        let port = {
            let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        let deadline = Deadline::after(Duration::from_millis(200));
        let err = exchange("127.0.0.1", port, "{}\n", deadline).unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "{err:?}");
    }
}
