//! Field-schema resolution for record kinds.
//!
//! A [`FieldSchema`] maps field names to display metadata. It is derived once
//! per kind from the field list the collaborator returns and memoized in a
//! [`SchemaCache`] that lives for a single aggregation call.

use crate::model::RecordKind;
use crate::source::RecordSource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One field of a record kind's schema, as defined by the host system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub fieldname: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Option or type info (e.g. the linked record type, or select choices).
    #[serde(default)]
    pub options: Option<String>,
}

/// Display metadata of a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    pub label: Option<String>,
    pub options: Option<String>,
}

/// Field name → metadata for one record kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: HashMap<String, FieldMeta>,
}

impl FieldSchema {
    /// Build a schema from a field list. Later duplicates win.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let fields = definitions
            .into_iter()
            .map(|def| {
                (
                    def.fieldname,
                    FieldMeta {
                        label: def.label.filter(|label| !label.is_empty()),
                        options: def.options.filter(|options| !options.is_empty()),
                    },
                )
            })
            .collect();
        Self { fields }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldMeta> {
        self.fields.get(field)
    }

    /// Display label of `field`, falling back to the raw field name.
    #[must_use]
    pub fn label_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.get(field)
            .and_then(|meta| meta.label.as_deref())
            .unwrap_or(field)
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    /// Fields sorted by name, for stable listings.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, &FieldMeta)> {
        let mut out: Vec<_> = self
            .fields
            .iter()
            .map(|(name, meta)| (name.as_str(), meta))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}

/// Per-call memo of resolved schemas, keyed by record kind.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: HashMap<RecordKind, FieldSchema>,
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the schema for `kind`, fetching it from `source` on first use.
    ///
    /// # Errors
    ///
    /// Returns the collaborator's error if the field list cannot be fetched.
    pub fn resolve<S: RecordSource + ?Sized>(
        &mut self,
        source: &S,
        kind: RecordKind,
    ) -> anyhow::Result<&FieldSchema> {
        if !self.schemas.contains_key(&kind) {
            let schema = FieldSchema::from_definitions(source.field_definitions(kind)?);
            tracing::debug!(kind = %kind, fields = schema.len(), "resolved field schema");
            self.schemas.insert(kind, schema);
        }
        self.schemas
            .get(&kind)
            .ok_or_else(|| anyhow::anyhow!("schema for {kind} missing after insert"))
    }
}
