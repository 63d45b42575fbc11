//! Connection bootstrap for the rundown database.
//!
//! # Invariants
//! - Returned connections have every migration applied, so both storage
//!   layouts find their tables.
//! - File databases run in WAL journal mode; in-memory ones keep the default.
//! - Each open logs exactly one `db_open` outcome line tagged with its target.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a rundown database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    File(PathBuf),
    Memory,
}

impl DbTarget {
    /// Maps an optional configured path; no path means a throwaway in-memory db.
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::File(path.to_path_buf()),
            None => Self::Memory,
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for DbTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(":memory:"),
        }
    }
}

/// Opens a database file, creating it when absent, and migrates it.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_target(&DbTarget::File(path.as_ref().to_path_buf()))
}

/// Opens a private in-memory database and migrates it.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(&DbTarget::Memory)
}

/// Opens whichever target the caller resolved from configuration.
pub fn open_target(target: &DbTarget) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.mode();

    let opened = match target {
        DbTarget::File(path) => Connection::open(path),
        DbTarget::Memory => Connection::open_in_memory(),
    }
    .map_err(Into::into)
    .and_then(|mut conn| prepare(&mut conn, target).map(|()| conn));

    match &opened {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={mode} target={target} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} target={target} duration_ms={} error_code=db_open_failed error={err}",
            started_at.elapsed().as_millis()
        ),
    }
    opened
}

fn prepare(conn: &mut Connection, target: &DbTarget) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if let DbTarget::File(_) = target {
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    }
    apply_migrations(conn)?;
    Ok(())
}
