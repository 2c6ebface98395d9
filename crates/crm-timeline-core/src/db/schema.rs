//! SQLite schema for the CRM record store.
//!
//! - `records` holds one row per lead or deal with its core fields
//! - `record_fields` lists each kind's field schema
//! - `versions` and `communications` hang off a record in stored order
//!
//! All timestamps are microseconds since the Unix epoch.

/// Migration v1: records, field schemas, version snapshots, communications.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS records (
    kind TEXT NOT NULL CHECK (kind IN ('lead', 'deal')),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    creation_us INTEGER NOT NULL,
    owner TEXT,
    lead TEXT,
    PRIMARY KEY (kind, name)
);

CREATE TABLE IF NOT EXISTS record_fields (
    kind TEXT NOT NULL CHECK (kind IN ('lead', 'deal')),
    position INTEGER NOT NULL,
    fieldname TEXT NOT NULL,
    label TEXT,
    options TEXT,
    PRIMARY KEY (kind, fieldname)
);

CREATE TABLE IF NOT EXISTS versions (
    version_id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    creation_us INTEGER NOT NULL,
    owner TEXT,
    data TEXT NOT NULL,
    FOREIGN KEY (kind, name) REFERENCES records(kind, name) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS communications (
    communication_id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    creation_us INTEGER NOT NULL,
    subject TEXT,
    content TEXT,
    sender_full_name TEXT,
    sender TEXT,
    recipients TEXT,
    cc TEXT,
    bcc TEXT,
    read_by_recipient INTEGER NOT NULL DEFAULT 0 CHECK (read_by_recipient IN (0, 1)),
    FOREIGN KEY (kind, name) REFERENCES records(kind, name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_versions_record
    ON versions(kind, name, version_id);

CREATE INDEX IF NOT EXISTS idx_communications_record
    ON communications(kind, name, communication_id);

CREATE INDEX IF NOT EXISTS idx_record_fields_position
    ON record_fields(kind, position);
";

/// Indexes expected after migrations complete.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_versions_record",
    "idx_communications_record",
    "idx_record_fields_position",
];
