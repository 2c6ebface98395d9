//! Timeline aggregation entry point.
//!
//! [`Timeline::get_activities`] resolves whether a name refers to a deal or a
//! lead (deals win), fetches the record's history through a
//! [`RecordSource`], and builds its feed. A deal converted from a lead gets
//! the lead's full feed as a prefix.

use crate::builder::{RecordHistory, build_activities};
use crate::decode::DecodeMode;
use crate::error::TimelineError;
use crate::model::{Activity, RecordKind};
use crate::schema::SchemaCache;
use crate::source::RecordSource;

/// Aggregates activity feeds from a [`RecordSource`].
///
/// Each call to [`get_activities`](Self::get_activities) is independent:
/// schemas are memoized only for the duration of that call.
pub struct Timeline<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    mode: DecodeMode,
}

impl<'a, S: RecordSource + ?Sized> Timeline<'a, S> {
    #[must_use]
    pub const fn new(source: &'a S) -> Self {
        Self {
            source,
            mode: DecodeMode::Lenient,
        }
    }

    /// Set how unreadable version snapshots are handled.
    #[must_use]
    pub const fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build the activity feed of the deal or lead named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::NotFound`] if no deal or lead has that name,
    /// or if a deal links to a lead that does not exist. Source failures are
    /// returned as [`TimelineError::Source`].
    pub fn get_activities(&self, name: &str) -> Result<Vec<Activity>, TimelineError> {
        let kind = self.resolve_kind(name)?;
        let mut schemas = SchemaCache::new();
        match kind {
            RecordKind::Deal => self.deal_activities(&mut schemas, name),
            RecordKind::Lead => self.lead_activities(&mut schemas, name),
        }
    }

    /// Determine the kind of the record named `name`, probing deals first.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::NotFound`] if neither kind matches.
    pub fn resolve_kind(&self, name: &str) -> Result<RecordKind, TimelineError> {
        for kind in RecordKind::ALL {
            if self.source.record_exists(kind, name)? {
                return Ok(kind);
            }
        }
        Err(TimelineError::NotFound {
            name: name.to_string(),
        })
    }

    fn fetch_history(&self, kind: RecordKind, name: &str) -> Result<RecordHistory, TimelineError> {
        let core = self.source.core_fields(kind, name)?.ok_or_else(|| {
            TimelineError::MissingCoreFields {
                kind,
                name: name.to_string(),
            }
        })?;
        Ok(RecordHistory {
            core,
            versions: self.source.version_history(kind, name)?,
            communications: self.source.communications(kind, name)?,
        })
    }

    fn lead_activities(
        &self,
        schemas: &mut SchemaCache,
        name: &str,
    ) -> Result<Vec<Activity>, TimelineError> {
        let history = self.fetch_history(RecordKind::Lead, name)?;
        let schema = schemas.resolve(self.source, RecordKind::Lead)?;
        build_activities(RecordKind::Lead, name, history, schema, self.mode, None)
    }

    fn deal_activities(
        &self,
        schemas: &mut SchemaCache,
        name: &str,
    ) -> Result<Vec<Activity>, TimelineError> {
        let history = self.fetch_history(RecordKind::Deal, name)?;

        let lead_feed = match history.core.lead.as_deref().filter(|lead| !lead.is_empty()) {
            Some(lead) => {
                if !self.source.record_exists(RecordKind::Lead, lead)? {
                    tracing::warn!(deal = name, lead, "deal links to a missing lead");
                    return Err(TimelineError::NotFound {
                        name: lead.to_string(),
                    });
                }
                Some(self.lead_activities(schemas, lead)?)
            }
            None => None,
        };

        let schema = schemas.resolve(self.source, RecordKind::Deal)?;
        build_activities(RecordKind::Deal, name, history, schema, self.mode, lead_feed)
    }
}

/// Build the activity feed of `name` with default (lenient) decoding.
///
/// # Errors
///
/// See [`Timeline::get_activities`].
pub fn get_activities<S: RecordSource + ?Sized>(
    source: &S,
    name: &str,
) -> Result<Vec<Activity>, TimelineError> {
    Timeline::new(source).get_activities(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityData, CoreFields, DEAL_CONVERTED_TEXT};
    use crate::source::MemorySource;
    use chrono::{TimeZone, Utc};

    fn core(secs: i64, lead: Option<&str>) -> CoreFields {
        CoreFields {
            creation: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
            owner: Some("owner".to_string()),
            lead: lead.map(str::to_string),
        }
    }

    #[test]
    fn unknown_name_is_not_found() {
        let source = MemorySource::new();
        let err = get_activities(&source, "nonexistent").expect_err("should fail");
        assert!(matches!(err, TimelineError::NotFound { ref name } if name == "nonexistent"));
    }

    #[test]
    fn deal_wins_over_lead_with_same_name() {
        let mut source = MemorySource::new();
        source.insert_record(RecordKind::Lead, "SHARED", core(1, None));
        source.insert_record(RecordKind::Deal, "SHARED", core(2, None));

        let timeline = Timeline::new(&source);
        assert_eq!(timeline.resolve_kind("SHARED").expect("kind"), RecordKind::Deal);
        let feed = timeline.get_activities("SHARED").expect("feed");
        assert_eq!(feed.len(), 1);
        assert!(!feed[0].is_lead);
    }

    #[test]
    fn deal_linked_to_missing_lead_is_not_found() {
        let mut source = MemorySource::new();
        source.insert_record(RecordKind::Deal, "CRM-DEAL-0001", core(2, Some("GHOST")));

        let err = get_activities(&source, "CRM-DEAL-0001").expect_err("should fail");
        assert!(matches!(err, TimelineError::NotFound { ref name } if name == "GHOST"));
    }

    #[test]
    fn empty_lead_link_is_a_direct_deal() {
        let mut source = MemorySource::new();
        source.insert_record(RecordKind::Deal, "CRM-DEAL-0001", core(2, Some("")));

        let feed = get_activities(&source, "CRM-DEAL-0001").expect("feed");
        assert_eq!(feed.len(), 1);
        assert_eq!(
            feed[0].data,
            ActivityData::Creation("created this deal".to_string())
        );
    }

    #[test]
    fn converted_deal_resolves_each_schema_once() {
        let mut source = MemorySource::new();
        source.insert_record(RecordKind::Lead, "CRM-LEAD-0001", core(1, None));
        source.insert_record(
            RecordKind::Deal,
            "CRM-DEAL-0001",
            core(2, Some("CRM-LEAD-0001")),
        );

        let feed = get_activities(&source, "CRM-DEAL-0001").expect("feed");
        assert_eq!(feed.len(), 2);
        assert_eq!(
            feed[0].data,
            ActivityData::Creation(DEAL_CONVERTED_TEXT.to_string())
        );
        assert!(feed[1].is_lead);
        assert_eq!(source.schema_fetches(RecordKind::Lead), 1);
        assert_eq!(source.schema_fetches(RecordKind::Deal), 1);
    }
}
