//! Activity assembly for a single record.
//!
//! [`build_activities`] is a pure function over already-fetched data: the
//! record's core fields, its version snapshots, its communications, and the
//! resolved field schema of its kind. Fetching lives in [`crate::feed`].

use crate::decode::{DecodeMode, decode_version};
use crate::error::TimelineError;
use crate::group::group_consecutive_edits;
use crate::model::{
    Activity, Communication, CoreFields, DEAL_CONVERTED_TEXT, DEAL_CREATED_TEXT,
    LEAD_CREATED_TEXT, RawVersion, RecordKind,
};
use crate::schema::FieldSchema;

/// Everything fetched about one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHistory {
    pub core: CoreFields,
    /// Version snapshots in stored order.
    pub versions: Vec<RawVersion>,
    pub communications: Vec<Communication>,
}

/// Text of a record's creation activity.
#[must_use]
pub const fn creation_text(kind: RecordKind, converted_from_lead: bool) -> &'static str {
    match kind {
        RecordKind::Lead => LEAD_CREATED_TEXT,
        RecordKind::Deal if converted_from_lead => DEAL_CONVERTED_TEXT,
        RecordKind::Deal => DEAL_CREATED_TEXT,
    }
}

/// Stable sort, newest first. Equal timestamps keep their input order.
pub fn sort_newest_first(activities: &mut [Activity]) {
    activities.sort_by(|a, b| b.creation.cmp(&a.creation));
}

/// Build the grouped, newest-first feed of one record.
///
/// `lead_feed` is the already-built feed of the lead a deal was converted
/// from; it becomes a prefix of the deal's own activities before the
/// combined list is sorted and grouped again. Pass `None` for leads and for
/// deals created directly.
///
/// # Errors
///
/// Returns [`TimelineError::MalformedVersion`] in [`DecodeMode::Strict`] when
/// a snapshot cannot be decoded. In [`DecodeMode::Lenient`] such snapshots
/// are skipped with a warning.
pub fn build_activities(
    kind: RecordKind,
    name: &str,
    history: RecordHistory,
    schema: &FieldSchema,
    mode: DecodeMode,
    lead_feed: Option<Vec<Activity>>,
) -> Result<Vec<Activity>, TimelineError> {
    let RecordHistory {
        core,
        versions,
        communications,
    } = history;
    let is_lead = kind.is_lead();
    let converted = lead_feed.is_some();

    let mut activities = lead_feed.unwrap_or_default();
    activities.reserve(1 + versions.len() + communications.len());

    activities.push(Activity::creation(
        core.creation,
        core.owner,
        creation_text(kind, converted),
        is_lead,
    ));

    let mut skipped = 0_usize;
    for version in versions.into_iter().rev() {
        match decode_version(&version, schema, kind) {
            Ok(Some(edit)) => activities.push(Activity::field_edit(
                version.creation,
                version.owner,
                edit,
                is_lead,
            )),
            Ok(None) => {}
            Err(err) => match mode {
                DecodeMode::Strict => {
                    return Err(TimelineError::MalformedVersion {
                        kind,
                        name: name.to_string(),
                        reason: err.to_string(),
                    });
                }
                DecodeMode::Lenient => {
                    skipped += 1;
                    tracing::warn!(
                        kind = %kind,
                        record = name,
                        creation = %version.creation,
                        error = %err,
                        "skipping unreadable version snapshot"
                    );
                }
            },
        }
    }

    activities.extend(
        communications
            .into_iter()
            .map(|comm| Activity::communication(comm.creation, comm.data, is_lead)),
    );

    sort_newest_first(&mut activities);
    let grouped = group_consecutive_edits(activities);

    tracing::debug!(
        kind = %kind,
        record = name,
        activities = grouped.len(),
        skipped,
        "built activity feed"
    );
    Ok(grouped)
}
