//! SQLite record store.
//!
//! Connections are opened with the same runtime pragmas everywhere:
//! - `journal_mode = WAL` so readers never block the host's writers
//! - `busy_timeout = 5s` to ride out transient lock contention
//! - `foreign_keys = ON` so history rows cannot outlive their record

pub mod load;
pub mod migrations;
pub mod schema;
pub mod store;

pub use load::{Fixture, load_fixture};
pub use store::SqliteSource;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, types::Type};
use std::{path::Path, time::Duration};

/// Busy timeout used for record store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the record store, apply runtime pragmas, and migrate the
/// schema to the latest version.
///
/// # Errors
///
/// Returns an error if opening, configuring, or migrating the database fails.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create record store directory {}", parent.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open record store {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    migrations::migrate(&mut conn).context("apply record store migrations")?;

    Ok(conn)
}

/// Open an existing record store for reading only.
///
/// The file is never created, migrated, or switched to another journal mode.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or its schema is older
/// than [`migrations::LATEST_SCHEMA_VERSION`].
pub fn open_store_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open record store {} read-only", path.display()))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
        .context("configure busy timeout")?;

    let version =
        migrations::current_schema_version(&conn).context("read record store schema version")?;
    if version < migrations::LATEST_SCHEMA_VERSION {
        anyhow::bail!(
            "record store {} is at schema v{version}, expected v{}; run `crmtl import` to upgrade it",
            path.display(),
            migrations::LATEST_SCHEMA_VERSION
        );
    }
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// Decode a stored microsecond timestamp read from column `col`.
pub(crate) fn datetime_from_us(col: usize, us: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(us).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            col,
            Type::Integer,
            format!("timestamp {us}us out of range").into(),
        )
    })
}
