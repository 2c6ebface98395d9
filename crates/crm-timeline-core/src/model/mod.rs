//! Timeline data model: record kinds, collaborator shapes, and activities.

pub mod activity;
pub mod record;

pub use activity::{
    Activity, ActivityData, ActivityType, DEAL_CONVERTED_TEXT, DEAL_CREATED_TEXT, FieldDelta,
    FieldEdit, LEAD_CREATED_TEXT,
};
pub use record::{
    Communication, CommunicationData, CoreFields, RawVersion, RecordKind, UnknownRecordKind,
};
