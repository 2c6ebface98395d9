//! Change decoding: one raw version snapshot into at most one field edit.
//!
//! A snapshot's `data` is a JSON document whose `changed` key lists
//! `[field, old_value, new_value]` triples. Only the first triple is ever
//! considered; later triples of the same snapshot are dropped, and no
//! fallback to them happens when the first one is suppressed.
//!
//! Emptiness follows the host system's truthiness rules: `null`, `false`,
//! `0`, `""`, `[]` and `{}` are empty.

use crate::model::{FieldDelta, FieldEdit, RawVersion, RecordKind};
use crate::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::FpCategory;

/// How unreadable snapshots are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Skip the snapshot and log a warning.
    #[default]
    Lenient,
    /// Fail the whole aggregation.
    Strict,
}

impl DecodeMode {
    #[must_use]
    pub const fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }
}

/// A single `(field, old_value, new_value)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// Why a snapshot's change list could not be read.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("version data is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("version data must be a JSON object")]
    NotAnObject,

    #[error("`changed` must be a list, got {0}")]
    ChangedNotAList(&'static str),

    #[error("first change must be a [field, old, new] triple, got {0}")]
    BadTriple(String),
}

/// Whether a JSON value counts as empty.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.classify() == FpCategory::Zero),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract the first field change of a snapshot's JSON `data`.
///
/// Returns `Ok(None)` when the change list is missing or empty, or when its
/// first element is itself empty.
///
/// # Errors
///
/// Returns a [`DecodeError`] if `data` is not JSON, `changed` is not a list,
/// or the first element is not a `[field, old, new]` triple.
pub fn first_change(data: &str) -> Result<Option<FieldChange>, DecodeError> {
    let doc: Value = serde_json::from_str(data)?;
    let Value::Object(mut doc) = doc else {
        return Err(DecodeError::NotAnObject);
    };

    let changed = match doc.remove("changed") {
        None => return Ok(None),
        Some(changed) if is_empty_value(&changed) => return Ok(None),
        Some(Value::Array(changed)) => changed,
        Some(other) => return Err(DecodeError::ChangedNotAList(json_kind(&other))),
    };

    let Some(first) = changed.into_iter().next() else {
        return Ok(None);
    };
    if is_empty_value(&first) {
        return Ok(None);
    }

    match first {
        Value::Array(triple) => match <[Value; 3]>::try_from(triple) {
            Ok([Value::String(field), old_value, new_value]) => Ok(Some(FieldChange {
                field,
                old_value,
                new_value,
            })),
            Ok([field, _, _]) => Err(DecodeError::BadTriple(format!(
                "field name of type {}",
                json_kind(&field)
            ))),
            Err(items) => Err(DecodeError::BadTriple(format!(
                "array of length {}",
                items.len()
            ))),
        },
        other => Err(DecodeError::BadTriple(json_kind(&other).to_string())),
    }
}

/// Classify one field change against a schema.
///
/// Returns `None` when the field is unknown to the schema, is the
/// `suppressed` linkage field, or both of its values are empty.
#[must_use]
pub fn decode_change(
    change: FieldChange,
    schema: &FieldSchema,
    suppressed: &str,
) -> Option<FieldEdit> {
    let FieldChange {
        field,
        old_value,
        new_value,
    } = change;

    let Some(meta) = schema.get(&field) else {
        tracing::trace!(field = %field, "skipping change to field outside schema");
        return None;
    };
    if field == suppressed {
        tracing::trace!(field = %field, "skipping change to linkage field");
        return None;
    }

    let old_empty = is_empty_value(&old_value);
    let new_empty = is_empty_value(&new_value);

    let delta = match (old_empty, new_empty) {
        (true, true) => return None,
        (true, false) => FieldDelta::Added { value: new_value },
        (false, true) => FieldDelta::Removed { value: old_value },
        (false, false) => FieldDelta::Changed {
            old_value,
            value: new_value,
        },
    };

    Some(FieldEdit {
        field_label: meta.label.clone().unwrap_or_else(|| field.clone()),
        options: meta.options.clone(),
        field,
        delta,
    })
}

/// Decode a stored version snapshot of a `kind` record.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the snapshot's change list is unreadable.
pub fn decode_version(
    version: &RawVersion,
    schema: &FieldSchema,
    kind: RecordKind,
) -> Result<Option<FieldEdit>, DecodeError> {
    Ok(first_change(&version.data)?
        .and_then(|change| decode_change(change, schema, kind.suppressed_field())))
}
