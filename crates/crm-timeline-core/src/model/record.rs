//! Record kinds and the collaborator-facing record shapes.
//!
//! A record is either a lead or a deal. Each kind owns its own field schema,
//! a linkage field that never surfaces as a visible change, and the wording
//! of its creation activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two CRM record kinds that carry an activity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// A prospective customer that may later be converted into a deal.
    Lead,
    /// A sales opportunity, optionally converted from a lead.
    Deal,
}

/// Error returned when parsing an unknown record kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecordKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownRecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown record kind '{}': expected one of lead, deal",
            self.raw
        )
    }
}

impl std::error::Error for UnknownRecordKind {}

impl RecordKind {
    /// All kinds, in the order the aggregator probes them.
    pub const ALL: [Self; 2] = [Self::Deal, Self::Lead];

    /// Return the canonical lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Deal => "deal",
        }
    }

    /// Field whose changes are never surfaced as activities for this kind.
    ///
    /// For deals this is the link to the originating lead; for leads it is
    /// the conversion marker set when the lead becomes a deal.
    #[must_use]
    pub const fn suppressed_field(self) -> &'static str {
        match self {
            Self::Lead => "converted",
            Self::Deal => "lead",
        }
    }

    /// Whether activities built for this kind are flagged as lead history.
    #[must_use]
    pub const fn is_lead(self) -> bool {
        matches!(self, Self::Lead)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = UnknownRecordKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lead" => Ok(Self::Lead),
            "deal" => Ok(Self::Deal),
            _ => Err(UnknownRecordKind { raw: s.to_string() }),
        }
    }
}

impl Serialize for RecordKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// The core columns of a record needed to emit its creation activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreFields {
    pub creation: DateTime<Utc>,
    pub owner: Option<String>,
    /// Originating lead for a converted deal. Always `None` for leads.
    pub lead: Option<String>,
}

/// One stored version snapshot, as returned by the history collaborator.
///
/// `data` is the raw JSON document recorded at save time, of the shape
/// `{"changed": [[field, old_value, new_value], ...], ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVersion {
    pub creation: DateTime<Utc>,
    pub owner: Option<String>,
    pub data: String,
}

/// A communication (email or message) attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Communication {
    pub creation: DateTime<Utc>,
    pub data: CommunicationData,
}

/// The pass-through payload of a communication activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationData {
    pub subject: Option<String>,
    pub content: Option<String>,
    pub sender_full_name: Option<String>,
    pub sender: Option<String>,
    pub recipients: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    #[serde(default)]
    pub read_by_recipient: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!("Lead".parse::<RecordKind>(), Ok(RecordKind::Lead));
        assert_eq!(" deal ".parse::<RecordKind>(), Ok(RecordKind::Deal));
    }

    #[test]
    fn parse_unknown_reports_raw_input() {
        let err = "contact".parse::<RecordKind>().expect_err("should fail");
        assert_eq!(err.raw, "contact");
        assert!(err.to_string().contains("expected one of lead, deal"));
    }

    #[test]
    fn suppressed_fields_are_kind_specific() {
        assert_eq!(RecordKind::Deal.suppressed_field(), "lead");
        assert_eq!(RecordKind::Lead.suppressed_field(), "converted");
    }

    #[test]
    fn deals_are_probed_before_leads() {
        assert_eq!(RecordKind::ALL, [RecordKind::Deal, RecordKind::Lead]);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&RecordKind::Deal).expect("serialize");
        assert_eq!(json, "\"deal\"");
        let back: RecordKind = serde_json::from_str("\"lead\"").expect("deserialize");
        assert_eq!(back, RecordKind::Lead);
    }
}
