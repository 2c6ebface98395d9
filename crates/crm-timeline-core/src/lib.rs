//! crm-timeline-core library.
//!
//! Builds the chronological activity feed of a CRM lead or deal from its
//! creation record, field-change history, and communications.
//!
//! # Conventions
//!
//! - **Errors**: domain failures are [`TimelineError`]; storage helpers return
//!   `anyhow::Result` with context.
//! - **Logging**: `tracing` macros only; the binary installs the subscriber.

pub mod builder;
pub mod config;
pub mod db;
pub mod decode;
pub mod error;
pub mod feed;
pub mod group;
pub mod model;
pub mod schema;
pub mod source;

pub use decode::DecodeMode;
pub use error::{ErrorCode, TimelineError};
pub use feed::{Timeline, get_activities};
pub use model::{Activity, ActivityData, ActivityType, RecordKind};
pub use source::{MemorySource, RecordSource};
