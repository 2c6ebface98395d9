//! Collaborator contract for record, schema, history, and communication data.
//!
//! The timeline core never talks to storage directly. Everything it reads
//! goes through [`RecordSource`], which hosts implement over their own
//! backend. Two implementations ship with the crate: the `SQLite` adapter in
//! [`crate::db::SqliteSource`] and the in-memory [`MemorySource`] used by
//! tests and embedding hosts that already hold the data.

use crate::model::{Communication, CoreFields, RawVersion, RecordKind};
use crate::schema::FieldDefinition;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

/// Read-only access to the data a timeline is built from.
///
/// All methods are queries; implementations must not mutate the records
/// they serve. Errors are propagated unchanged to the caller of the
/// aggregation.
pub trait RecordSource {
    /// Whether a record of `kind` named `name` exists.
    fn record_exists(&self, kind: RecordKind, name: &str) -> Result<bool>;

    /// The field list of `kind`'s schema.
    fn field_definitions(&self, kind: RecordKind) -> Result<Vec<FieldDefinition>>;

    /// Creation timestamp, owner, and (for deals) the originating lead.
    ///
    /// Returns `Ok(None)` when the record does not exist.
    fn core_fields(&self, kind: RecordKind, name: &str) -> Result<Option<CoreFields>>;

    /// Version snapshots of the record, in stored order.
    fn version_history(&self, kind: RecordKind, name: &str) -> Result<Vec<RawVersion>>;

    /// Communications attached to the record, in stored order.
    fn communications(&self, kind: RecordKind, name: &str) -> Result<Vec<Communication>>;
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    fn record_exists(&self, kind: RecordKind, name: &str) -> Result<bool> {
        (**self).record_exists(kind, name)
    }

    fn field_definitions(&self, kind: RecordKind) -> Result<Vec<FieldDefinition>> {
        (**self).field_definitions(kind)
    }

    fn core_fields(&self, kind: RecordKind, name: &str) -> Result<Option<CoreFields>> {
        (**self).core_fields(kind, name)
    }

    fn version_history(&self, kind: RecordKind, name: &str) -> Result<Vec<RawVersion>> {
        (**self).version_history(kind, name)
    }

    fn communications(&self, kind: RecordKind, name: &str) -> Result<Vec<Communication>> {
        (**self).communications(kind, name)
    }
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    core: CoreFields,
    versions: Vec<RawVersion>,
    communications: Vec<Communication>,
}

/// An in-memory [`RecordSource`].
#[derive(Debug, Default)]
pub struct MemorySource {
    fields: HashMap<RecordKind, Vec<FieldDefinition>>,
    records: HashMap<(RecordKind, String), MemoryRecord>,
    schema_fetches: RefCell<HashMap<RecordKind, usize>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the schema field list of `kind`.
    pub fn set_fields(&mut self, kind: RecordKind, fields: Vec<FieldDefinition>) {
        self.fields.insert(kind, fields);
    }

    /// Insert (or replace) a record with empty history.
    pub fn insert_record(&mut self, kind: RecordKind, name: impl Into<String>, core: CoreFields) {
        self.records.insert(
            (kind, name.into()),
            MemoryRecord {
                core,
                versions: Vec::new(),
                communications: Vec::new(),
            },
        );
    }

    /// Append a version snapshot to an existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has not been inserted.
    pub fn push_version(&mut self, kind: RecordKind, name: &str, version: RawVersion) -> Result<()> {
        self.record_mut(kind, name)?.versions.push(version);
        Ok(())
    }

    /// Append a communication to an existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has not been inserted.
    pub fn push_communication(
        &mut self,
        kind: RecordKind,
        name: &str,
        communication: Communication,
    ) -> Result<()> {
        self.record_mut(kind, name)?
            .communications
            .push(communication);
        Ok(())
    }

    /// How many times the schema of `kind` has been fetched.
    #[must_use]
    pub fn schema_fetches(&self, kind: RecordKind) -> usize {
        self.schema_fetches
            .borrow()
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    fn record(&self, kind: RecordKind, name: &str) -> Option<&MemoryRecord> {
        self.records.get(&(kind, name.to_string()))
    }

    fn record_mut(&mut self, kind: RecordKind, name: &str) -> Result<&mut MemoryRecord> {
        self.records
            .get_mut(&(kind, name.to_string()))
            .ok_or_else(|| anyhow::anyhow!("{kind} '{name}' has not been inserted"))
    }
}

impl RecordSource for MemorySource {
    fn record_exists(&self, kind: RecordKind, name: &str) -> Result<bool> {
        Ok(self.record(kind, name).is_some())
    }

    fn field_definitions(&self, kind: RecordKind) -> Result<Vec<FieldDefinition>> {
        *self.schema_fetches.borrow_mut().entry(kind).or_default() += 1;
        Ok(self.fields.get(&kind).cloned().unwrap_or_default())
    }

    fn core_fields(&self, kind: RecordKind, name: &str) -> Result<Option<CoreFields>> {
        Ok(self.record(kind, name).map(|record| record.core.clone()))
    }

    fn version_history(&self, kind: RecordKind, name: &str) -> Result<Vec<RawVersion>> {
        Ok(self
            .record(kind, name)
            .map(|record| record.versions.clone())
            .unwrap_or_default())
    }

    fn communications(&self, kind: RecordKind, name: &str) -> Result<Vec<Communication>> {
        Ok(self
            .record(kind, name)
            .map(|record| record.communications.clone())
            .unwrap_or_default())
    }
}
