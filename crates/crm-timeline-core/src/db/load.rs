//! Bulk loading of records into the store from a JSON fixture document.
//!
//! This is the only write path in the crate. Loading a record replaces any
//! existing record of the same kind and name together with its history, and
//! loading a kind's field list replaces that kind's schema.

use super::datetime_from_us;
use crate::model::{CommunicationData, RecordKind};
use crate::schema::FieldDefinition;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// A self-contained set of field schemas and records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub fields: BTreeMap<RecordKind, Vec<FieldDefinition>>,
    #[serde(default)]
    pub records: Vec<FixtureRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub kind: RecordKind,
    pub name: String,
    pub creation: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub lead: Option<String>,
    #[serde(default)]
    pub versions: Vec<FixtureVersion>,
    #[serde(default)]
    pub communications: Vec<FixtureCommunication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureVersion {
    pub creation: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Snapshot document. A JSON string is stored verbatim, so fixtures can
    /// carry deliberately malformed snapshots; any other value is serialized.
    pub data: Value,
}

impl FixtureVersion {
    fn stored_data(&self) -> String {
        match &self.data {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureCommunication {
    pub creation: DateTime<Utc>,
    #[serde(flatten)]
    pub data: CommunicationData,
}

/// Row counts written by [`load_fixture`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub fields: usize,
    pub records: usize,
    pub versions: usize,
    pub communications: usize,
}

/// Read a fixture document from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid fixture.
pub fn read_fixture(path: &Path) -> Result<Fixture> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read fixture {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse fixture {}", path.display()))
}

/// Write every schema and record of `fixture` in one transaction.
///
/// # Errors
///
/// Returns an error if any insert fails; nothing is written in that case.
pub fn load_fixture(conn: &mut Connection, fixture: &Fixture) -> Result<LoadSummary> {
    let tx = conn.transaction().context("begin fixture load")?;
    let mut summary = LoadSummary::default();

    for (kind, fields) in &fixture.fields {
        replace_fields(&tx, *kind, fields)
            .with_context(|| format!("load {kind} field schema"))?;
        summary.fields += fields.len();
    }

    for record in &fixture.records {
        replace_record(&tx, record)
            .with_context(|| format!("load {} '{}'", record.kind, record.name))?;
        summary.records += 1;
        summary.versions += record.versions.len();
        summary.communications += record.communications.len();
    }

    tx.commit().context("commit fixture load")?;
    tracing::info!(
        fields = summary.fields,
        records = summary.records,
        versions = summary.versions,
        communications = summary.communications,
        "loaded fixture"
    );
    Ok(summary)
}

fn replace_fields(
    tx: &Transaction<'_>,
    kind: RecordKind,
    fields: &[FieldDefinition],
) -> rusqlite::Result<()> {
    tx.execute(
        "DELETE FROM record_fields WHERE kind = ?1",
        params![kind.as_str()],
    )?;
    let mut stmt = tx.prepare(
        "INSERT OR REPLACE INTO record_fields (kind, position, fieldname, label, options)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, field) in (0_i64..).zip(fields) {
        stmt.execute(params![
            kind.as_str(),
            position,
            field.fieldname,
            field.label,
            field.options
        ])?;
    }
    Ok(())
}

fn replace_record(tx: &Transaction<'_>, record: &FixtureRecord) -> rusqlite::Result<()> {
    let kind = record.kind.as_str();
    tx.execute(
        "DELETE FROM records WHERE kind = ?1 AND name = ?2",
        params![kind, record.name],
    )?;
    tx.execute(
        "INSERT INTO records (kind, name, creation_us, owner, lead)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            kind,
            record.name,
            record.creation.timestamp_micros(),
            record.owner,
            record.lead
        ],
    )?;

    let mut versions = tx.prepare(
        "INSERT INTO versions (kind, name, creation_us, owner, data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for version in &record.versions {
        versions.execute(params![
            kind,
            record.name,
            version.creation.timestamp_micros(),
            version.owner,
            version.stored_data()
        ])?;
    }

    let mut communications = tx.prepare(
        "INSERT INTO communications (kind, name, creation_us, subject, content,
             sender_full_name, sender, recipients, cc, bcc, read_by_recipient)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for comm in &record.communications {
        let data = &comm.data;
        communications.execute(params![
            kind,
            record.name,
            comm.creation.timestamp_micros(),
            data.subject,
            data.content,
            data.sender_full_name,
            data.sender,
            data.recipients,
            data.cc,
            data.bcc,
            data.read_by_recipient
        ])?;
    }
    Ok(())
}

/// Total number of records in the store, for status output.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn record_count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
        .context("count records")?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Timestamp of the newest stored version, if any.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn latest_version_at(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let us: Option<i64> = conn
        .query_row("SELECT MAX(creation_us) FROM versions", [], |row| row.get(0))
        .context("query latest version")?;
    us.map(|us| datetime_from_us(0, us))
        .transpose()
        .context("decode latest version timestamp")
}
