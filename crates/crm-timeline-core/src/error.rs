use std::fmt;

use crate::model::RecordKind;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    FixtureParseError,
    RecordNotFound,
    MalformedVersion,
    StoreUnavailable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::FixtureParseError => "E1003",
            Self::RecordNotFound => "E2001",
            Self::MalformedVersion => "E3001",
            Self::StoreUnavailable => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::FixtureParseError => "Fixture file parse error",
            Self::RecordNotFound => "Document not found",
            Self::MalformedVersion => "Malformed version snapshot",
            Self::StoreUnavailable => "Record store unavailable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in crm-timeline.toml and retry."),
            Self::FixtureParseError => {
                Some("Check the fixture is JSON with `fields` and `records` keys.")
            }
            Self::RecordNotFound => Some("Check the lead or deal name and retry."),
            Self::MalformedVersion => {
                Some("Disable [decode] strict to skip unreadable snapshots.")
            }
            Self::StoreUnavailable => Some("Check the --db path and file permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by timeline aggregation.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Neither a deal nor a lead matches the requested name.
    #[error("Document not found: {name}")]
    NotFound { name: String },

    /// A record passed the existence check but its core fields are missing.
    #[error("{kind} '{name}' has no core fields")]
    MissingCoreFields { kind: RecordKind, name: String },

    /// A version snapshot could not be decoded (strict mode only).
    #[error("malformed version snapshot on {kind} '{name}': {reason}")]
    MalformedVersion {
        kind: RecordKind,
        name: String,
        reason: String,
    },

    /// The record source failed; propagated unchanged.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl TimelineError {
    /// The stable machine code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::RecordNotFound,
            Self::MissingCoreFields { .. } => ErrorCode::InternalUnexpected,
            Self::MalformedVersion { .. } => ErrorCode::MalformedVersion,
            Self::Source(_) => ErrorCode::StoreUnavailable,
        }
    }

    /// Remediation hint, falling back to the code's summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }
}
