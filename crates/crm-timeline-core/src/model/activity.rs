//! The activity entity and its typed payloads.
//!
//! An [`Activity`] is one entry of a record's timeline. Its payload is an
//! [`ActivityData`] variant rather than a loose JSON object, so the set of
//! keys each activity type carries is fixed by construction:
//!
//! | type            | `data`                                      |
//! |-----------------|---------------------------------------------|
//! | `creation`      | free text                                   |
//! | `changed`       | `field`, `field_label`, `old_value`, `value` |
//! | `added`         | `field`, `field_label`, `value`              |
//! | `removed`       | `field`, `field_label`, `value` (prior value) |
//! | `communication` | pass-through [`CommunicationData`]           |
//!
//! Serialization is hand-written to keep the wire shape the feed consumers
//! expect: `owner` is omitted for communications, `options` only appears on
//! field-change activities, and `other_versions` only on group heads.

use super::record::CommunicationData;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Creation text for a lead.
pub const LEAD_CREATED_TEXT: &str = "created this lead";
/// Creation text for a deal that did not originate from a lead.
pub const DEAL_CREATED_TEXT: &str = "created this deal";
/// Creation text for a deal converted from a lead.
pub const DEAL_CONVERTED_TEXT: &str = "converted the lead to this deal";

/// Discriminant of an activity, as exposed in `activity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    Creation,
    Changed,
    Added,
    Removed,
    Communication,
}

impl ActivityType {
    /// Return the canonical lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Changed => "changed",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Communication => "communication",
        }
    }

    /// True for the three field-change kinds that take part in grouping.
    #[must_use]
    pub const fn is_field_change(self) -> bool {
        matches!(self, Self::Changed | Self::Added | Self::Removed)
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActivityType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The old/new values of a single field delta, already classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDelta {
    /// Both the old and the new value are non-empty.
    Changed { old_value: Value, value: Value },
    /// The field went from empty to `value`.
    Added { value: Value },
    /// The field went from `value` to empty.
    Removed { value: Value },
}

impl FieldDelta {
    #[must_use]
    pub const fn activity_type(&self) -> ActivityType {
        match self {
            Self::Changed { .. } => ActivityType::Changed,
            Self::Added { .. } => ActivityType::Added,
            Self::Removed { .. } => ActivityType::Removed,
        }
    }

    /// The value the field holds after an add/change, or held before a removal.
    #[must_use]
    pub const fn value(&self) -> &Value {
        match self {
            Self::Changed { value, .. } | Self::Added { value } | Self::Removed { value } => value,
        }
    }
}

/// A decoded, labeled field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub field: String,
    pub field_label: String,
    pub delta: FieldDelta,
    /// Option/type metadata of the field from its schema, if any.
    pub options: Option<String>,
}

impl Serialize for FieldEdit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = match self.delta {
            FieldDelta::Changed { .. } => 4,
            FieldDelta::Added { .. } | FieldDelta::Removed { .. } => 3,
        };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("field", &self.field)?;
        map.serialize_entry("field_label", &self.field_label)?;
        match &self.delta {
            FieldDelta::Changed { old_value, value } => {
                map.serialize_entry("old_value", old_value)?;
                map.serialize_entry("value", value)?;
            }
            FieldDelta::Added { value } | FieldDelta::Removed { value } => {
                map.serialize_entry("value", value)?;
            }
        }
        map.end()
    }
}

/// Typed payload of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityData {
    /// Creation text, one of the `*_TEXT` constants.
    Creation(String),
    /// A field edit (`changed`, `added`, or `removed`).
    FieldEdit(FieldEdit),
    /// A communication, passed through verbatim.
    Communication(CommunicationData),
}

impl ActivityData {
    #[must_use]
    pub const fn activity_type(&self) -> ActivityType {
        match self {
            Self::Creation(_) => ActivityType::Creation,
            Self::FieldEdit(edit) => edit.delta.activity_type(),
            Self::Communication(_) => ActivityType::Communication,
        }
    }
}

impl Serialize for ActivityData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Creation(text) => text.serialize(serializer),
            Self::FieldEdit(edit) => edit.serialize(serializer),
            Self::Communication(comm) => comm.serialize(serializer),
        }
    }
}

/// One entry of a record's activity timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Sort key of the feed.
    pub creation: DateTime<Utc>,
    /// Acting user. Always `None` for communications.
    pub owner: Option<String>,
    pub data: ActivityData,
    /// True when the activity belongs to a lead's own history.
    pub is_lead: bool,
    /// Grouped siblings; only set on the head of a group of two or more.
    pub other_versions: Option<Vec<Activity>>,
}

impl Activity {
    /// Build the creation activity of a record.
    #[must_use]
    pub fn creation(
        creation: DateTime<Utc>,
        owner: Option<String>,
        text: &str,
        is_lead: bool,
    ) -> Self {
        Self {
            creation,
            owner,
            data: ActivityData::Creation(text.to_string()),
            is_lead,
            other_versions: None,
        }
    }

    /// Build a field-change activity from a decoded edit.
    #[must_use]
    pub fn field_edit(
        creation: DateTime<Utc>,
        owner: Option<String>,
        edit: FieldEdit,
        is_lead: bool,
    ) -> Self {
        Self {
            creation,
            owner,
            data: ActivityData::FieldEdit(edit),
            is_lead,
            other_versions: None,
        }
    }

    /// Build a communication activity. Communications carry no owner.
    #[must_use]
    pub fn communication(
        creation: DateTime<Utc>,
        data: CommunicationData,
        is_lead: bool,
    ) -> Self {
        Self {
            creation,
            owner: None,
            data: ActivityData::Communication(data),
            is_lead,
            other_versions: None,
        }
    }

    #[must_use]
    pub const fn activity_type(&self) -> ActivityType {
        self.data.activity_type()
    }

    /// True for `changed`, `added`, and `removed` activities.
    #[must_use]
    pub const fn is_field_change(&self) -> bool {
        self.activity_type().is_field_change()
    }

    /// The acting user, treating an empty string as absent.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref().filter(|owner| !owner.is_empty())
    }

    /// Field option metadata, for field-change activities only.
    #[must_use]
    pub fn options(&self) -> Option<&str> {
        match &self.data {
            ActivityData::FieldEdit(edit) => edit.options.as_deref(),
            _ => None,
        }
    }

    /// The grouped siblings of this activity, or an empty slice.
    #[must_use]
    pub fn other_versions(&self) -> &[Self] {
        self.other_versions.as_deref().unwrap_or_default()
    }
}

impl Serialize for Activity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let activity_type = self.activity_type();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("activity_type", &activity_type)?;
        map.serialize_entry("creation", &self.creation)?;
        if activity_type != ActivityType::Communication {
            map.serialize_entry("owner", &self.owner)?;
        }
        map.serialize_entry("data", &self.data)?;
        map.serialize_entry("is_lead", &self.is_lead)?;
        if let ActivityData::FieldEdit(edit) = &self.data {
            map.serialize_entry("options", &edit.options)?;
        }
        if let Some(others) = &self.other_versions {
            map.serialize_entry("other_versions", others)?;
        }
        map.end()
    }
}
