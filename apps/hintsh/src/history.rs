// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: SQLite-backed append-only command history for hintsh.
// Author: Lukas Bower

//! SQLite-backed append-only command history.
//!
//! The store never reports failures to its caller. If the database cannot be
//! opened the store runs disabled; failed inserts and queries are logged and
//! otherwise ignored.

use std::fmt;
use std::path::Path;

use log::{debug, warn};
use rusqlite::{params, Connection};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cmd TEXT NOT NULL,
    ts DATETIME DEFAULT CURRENT_TIMESTAMP
);";

/// One executed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Monotonic row identifier.
    pub id: i64,
    /// Insert time as stored by SQLite (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub timestamp: String,
    /// Command line as typed.
    pub cmd: String,
}

impl fmt::Display for HistoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}  {}  {}", self.id, self.timestamp, self.cmd)
    }
}

/// Durable command history.
#[derive(Debug)]
pub struct HistoryStore {
    conn: Option<Connection>,
}

impl HistoryStore {
    /// Open or create the store at `path`, falling back to a disabled store.
    pub fn initialize(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Connection::open(path).and_then(|conn| prepare(&conn).map(|()| conn)) {
            Ok(conn) => {
                debug!("history store opened at {}", path.display());
                Self { conn: Some(conn) }
            }
            Err(err) => {
                warn!(
                    "history disabled: cannot open {}: {err}",
                    path.display()
                );
                Self::disabled()
            }
        }
    }

    /// Store backed by a private in-memory database.
    pub fn in_memory() -> Self {
        match Connection::open_in_memory().and_then(|conn| prepare(&conn).map(|()| conn)) {
            Ok(conn) => Self { conn: Some(conn) },
            Err(err) => {
                warn!("history disabled: in-memory store failed: {err}");
                Self::disabled()
            }
        }
    }

    /// Store that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self { conn: None }
    }

    /// Whether a database is attached.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// Record `cmd` with the current timestamp and return its row id.
    pub fn append(&self, cmd: &str) -> Option<i64> {
        let conn = self.conn.as_ref()?;
        if cmd.is_empty() {
            return None;
        }
        match conn.execute("INSERT INTO history (cmd) VALUES (?1)", params![cmd]) {
            Ok(_) => Some(conn.last_insert_rowid()),
            Err(err) => {
                warn!("history insert failed: {err}");
                None
            }
        }
    }

    /// Up to `limit` rows, most recent first. Non-positive limits yield nothing.
    #[must_use]
    pub fn recent(&self, limit: i64) -> Vec<HistoryRecord> {
        let Some(conn) = self.conn.as_ref() else {
            return Vec::new();
        };
        if limit <= 0 {
            return Vec::new();
        }
        match query_recent(conn, limit) {
            Ok(records) => records,
            Err(err) => {
                warn!("history query failed: {err}");
                Vec::new()
            }
        }
    }

    /// Close the underlying database.
    pub fn close(self) {
        if let Some(conn) = self.conn {
            if let Err((_conn, err)) = conn.close() {
                warn!("history close failed: {err}");
            }
        }
    }
}

fn prepare(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

fn query_recent(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare("SELECT id, ts, cmd FROM history ORDER BY id DESC LIMIT ?1")?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(HistoryRecord {
            id: row.get(0)?,
            timestamp: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            cmd: row.get(2)?,
        })
    })?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}
