//! [`RecordSource`] over the SQLite record store.
//!
//! Every method is a single read query. [`SqliteSource::open`] uses a
//! read-only connection, so nothing here can write. Version and
//! communication rows are returned in insertion order, which is the stored
//! order the aggregator expects.

use super::{datetime_from_us, open_store_read_only};
use crate::model::{Communication, CommunicationData, CoreFields, RawVersion, RecordKind};
use crate::schema::FieldDefinition;
use crate::source::RecordSource;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// Read-only record source backed by a SQLite connection.
#[derive(Debug)]
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the existing store at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or predates the
    /// current schema.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: open_store_read_only(path)?,
        })
    }

    /// Wrap an already-configured connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl RecordSource for SqliteSource {
    fn record_exists(&self, kind: RecordKind, name: &str) -> Result<bool> {
        let sql = "SELECT EXISTS(SELECT 1 FROM records WHERE kind = ?1 AND name = ?2)";
        let exists: bool = self
            .conn
            .query_row(sql, params![kind.as_str(), name], |row| row.get(0))
            .with_context(|| format!("check whether {kind} '{name}' exists"))?;
        Ok(exists)
    }

    fn field_definitions(&self, kind: RecordKind) -> Result<Vec<FieldDefinition>> {
        let sql = "SELECT fieldname, label, options FROM record_fields \
                   WHERE kind = ?1 ORDER BY position, fieldname";
        let mut stmt = self.conn.prepare(sql).context("prepare field_definitions")?;
        let rows = stmt
            .query_map(params![kind.as_str()], |row| {
                Ok(FieldDefinition {
                    fieldname: row.get(0)?,
                    label: row.get(1)?,
                    options: row.get(2)?,
                })
            })
            .context("execute field_definitions")?;

        let mut fields = Vec::new();
        for row in rows {
            fields.push(row.context("read field definition row")?);
        }
        Ok(fields)
    }

    fn core_fields(&self, kind: RecordKind, name: &str) -> Result<Option<CoreFields>> {
        let sql = "SELECT creation_us, owner, lead FROM records WHERE kind = ?1 AND name = ?2";
        self.conn
            .query_row(sql, params![kind.as_str(), name], |row| {
                Ok(CoreFields {
                    creation: datetime_from_us(0, row.get(0)?)?,
                    owner: row.get(1)?,
                    lead: row.get(2)?,
                })
            })
            .optional()
            .with_context(|| format!("core_fields for {kind} '{name}'"))
    }

    fn version_history(&self, kind: RecordKind, name: &str) -> Result<Vec<RawVersion>> {
        let sql = "SELECT creation_us, owner, data FROM versions \
                   WHERE kind = ?1 AND name = ?2 ORDER BY version_id";
        let mut stmt = self.conn.prepare(sql).context("prepare version_history")?;
        let rows = stmt
            .query_map(params![kind.as_str(), name], |row| {
                Ok(RawVersion {
                    creation: datetime_from_us(0, row.get(0)?)?,
                    owner: row.get(1)?,
                    data: row.get(2)?,
                })
            })
            .context("execute version_history")?;

        let mut versions = Vec::new();
        for row in rows {
            versions.push(row.context("read version row")?);
        }
        Ok(versions)
    }

    fn communications(&self, kind: RecordKind, name: &str) -> Result<Vec<Communication>> {
        let sql = "SELECT creation_us, subject, content, sender_full_name, sender, \
                   recipients, cc, bcc, read_by_recipient \
                   FROM communications WHERE kind = ?1 AND name = ?2 \
                   ORDER BY communication_id";
        let mut stmt = self.conn.prepare(sql).context("prepare communications")?;
        let rows = stmt
            .query_map(params![kind.as_str(), name], |row| {
                Ok(Communication {
                    creation: datetime_from_us(0, row.get(0)?)?,
                    data: CommunicationData {
                        subject: row.get(1)?,
                        content: row.get(2)?,
                        sender_full_name: row.get(3)?,
                        sender: row.get(4)?,
                        recipients: row.get(5)?,
                        cc: row.get(6)?,
                        bcc: row.get(7)?,
                        read_by_recipient: row.get(8)?,
                    },
                })
            })
            .context("execute communications")?;

        let mut communications = Vec::new();
        for row in rows {
            communications.push(row.context("read communication row")?);
        }
        Ok(communications)
    }
}
