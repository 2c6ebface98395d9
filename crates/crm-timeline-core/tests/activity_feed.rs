use chrono::{DateTime, TimeZone, Utc};
use crm_timeline_core::db::{SqliteSource, load::read_fixture, load_fixture, open_store};
use crm_timeline_core::model::{
    Communication, CommunicationData, CoreFields, DEAL_CONVERTED_TEXT, FieldDelta, RawVersion,
};
use crm_timeline_core::schema::FieldDefinition;
use crm_timeline_core::{
    Activity, ActivityData, ActivityType, DecodeMode, MemorySource, RecordKind, Timeline,
    TimelineError, get_activities,
};
use serde_json::{Value, json};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp")
}

fn def(name: &str, label: &str) -> FieldDefinition {
    FieldDefinition {
        fieldname: name.to_string(),
        label: Some(label.to_string()),
        options: None,
    }
}

fn version(secs: i64, owner: &str, changed: Value) -> RawVersion {
    RawVersion {
        creation: ts(secs),
        owner: Some(owner.to_string()),
        data: json!({ "changed": changed }).to_string(),
    }
}

fn comm(secs: i64, subject: &str) -> Communication {
    Communication {
        creation: ts(secs),
        data: CommunicationData {
            subject: Some(subject.to_string()),
            sender: Some("client@example.com".to_string()),
            ..CommunicationData::default()
        },
    }
}

/// A lead converted into a deal, each with some history.
fn converted_pair() -> MemorySource {
    let mut source = MemorySource::new();
    source.set_fields(
        RecordKind::Lead,
        vec![def("email", "Email"), def("status", "Status"), def("converted", "Converted")],
    );
    source.set_fields(
        RecordKind::Deal,
        vec![def("status", "Status"), def("lead", "Lead"), def("deal_value", "Value")],
    );

    source.insert_record(
        RecordKind::Lead,
        "CRM-LEAD-0001",
        CoreFields {
            creation: ts(0),
            owner: Some("alice".to_string()),
            lead: None,
        },
    );
    source
        .push_version(
            RecordKind::Lead,
            "CRM-LEAD-0001",
            version(10, "alice", json!([["email", null, "x@y.z"]])),
        )
        .expect("push");
    source
        .push_version(
            RecordKind::Lead,
            "CRM-LEAD-0001",
            version(20, "alice", json!([["converted", 0, 1]])),
        )
        .expect("push");
    source
        .push_communication(RecordKind::Lead, "CRM-LEAD-0001", comm(15, "Intro"))
        .expect("push");

    source.insert_record(
        RecordKind::Deal,
        "CRM-DEAL-0001",
        CoreFields {
            creation: ts(30),
            owner: Some("bob".to_string()),
            lead: Some("CRM-LEAD-0001".to_string()),
        },
    );
    source
        .push_version(
            RecordKind::Deal,
            "CRM-DEAL-0001",
            version(31, "bob", json!([["lead", null, "CRM-LEAD-0001"]])),
        )
        .expect("push");
    source
        .push_version(
            RecordKind::Deal,
            "CRM-DEAL-0001",
            version(40, "bob", json!([["status", "Qualification", "Won"]])),
        )
        .expect("push");
    source
        .push_version(
            RecordKind::Deal,
            "CRM-DEAL-0001",
            version(41, "bob", json!([["deal_value", 0, 5000]])),
        )
        .expect("push");
    source
}

fn assert_sorted(feed: &[Activity]) {
    for pair in feed.windows(2) {
        assert!(
            pair[0].creation >= pair[1].creation,
            "feed not newest-first: {} before {}",
            pair[0].creation,
            pair[1].creation
        );
    }
}

#[test]
fn converted_deal_feed_has_lead_prefix() {
    let source = converted_pair();
    let feed = get_activities(&source, "CRM-DEAL-0001").expect("feed");
    assert_sorted(&feed);

    let summary: Vec<(ActivityType, bool)> = feed
        .iter()
        .map(|a| (a.activity_type(), a.is_lead))
        .collect();
    assert_eq!(
        summary,
        [
            (ActivityType::Added, false),
            (ActivityType::Creation, false),
            (ActivityType::Communication, true),
            (ActivityType::Added, true),
            (ActivityType::Creation, true),
        ]
    );

    // deal_value at 41 and status at 40, both by bob, form one group.
    let head = &feed[0];
    assert_eq!(head.creation, ts(41));
    assert_eq!(head.other_versions().len(), 1);
    assert_eq!(head.other_versions()[0].creation, ts(40));

    assert_eq!(
        feed[1].data,
        ActivityData::Creation(DEAL_CONVERTED_TEXT.to_string())
    );
}

#[test]
fn linkage_changes_never_surface() {
    let source = converted_pair();
    for name in ["CRM-DEAL-0001", "CRM-LEAD-0001"] {
        let feed = get_activities(&source, name).expect("feed");
        let mut all: Vec<&Activity> = Vec::new();
        for activity in &feed {
            all.push(activity);
            all.extend(activity.other_versions());
        }
        for activity in all {
            if let ActivityData::FieldEdit(edit) = &activity.data {
                let suppressed = if activity.is_lead { "converted" } else { "lead" };
                assert_ne!(edit.field, suppressed, "{name} surfaced a linkage change");
            }
        }
    }
}

#[test]
fn lead_feed_alone_is_flagged_as_lead() {
    let source = converted_pair();
    let feed = get_activities(&source, "CRM-LEAD-0001").expect("feed");
    assert_eq!(feed.len(), 3);
    assert!(feed.iter().all(|a| a.is_lead));
    assert_eq!(feed[2].activity_type(), ActivityType::Creation);
}

#[test]
fn json_shape_matches_client_contract() {
    let source = converted_pair();
    let feed = get_activities(&source, "CRM-DEAL-0001").expect("feed");
    let json = serde_json::to_value(&feed).expect("serialize");

    let head = &json[0];
    assert_eq!(head["activity_type"], "added");
    assert_eq!(head["owner"], "bob");
    assert_eq!(head["data"]["field"], "deal_value");
    assert_eq!(head["data"]["field_label"], "Value");
    assert_eq!(head["data"]["value"], 5000);
    assert!(head["data"].get("old_value").is_none());
    assert!(head.get("options").is_some());

    let sibling = &head["other_versions"][0];
    assert_eq!(sibling["activity_type"], "changed");
    assert_eq!(sibling["data"]["old_value"], "Qualification");
    assert_eq!(sibling["data"]["value"], "Won");

    let creation = &json[1];
    assert_eq!(creation["data"], DEAL_CONVERTED_TEXT);
    assert!(creation.get("other_versions").is_none());
    assert!(creation.get("options").is_none());

    let communication = &json[2];
    assert_eq!(communication["activity_type"], "communication");
    assert_eq!(communication["data"]["subject"], "Intro");
    assert!(communication.get("owner").is_none());
}

#[test]
fn communication_between_edits_breaks_grouping() {
    let mut source = MemorySource::new();
    source.set_fields(RecordKind::Lead, vec![def("a", "A"), def("b", "B"), def("c", "C")]);
    source.insert_record(
        RecordKind::Lead,
        "CRM-LEAD-0002",
        CoreFields {
            creation: ts(0),
            owner: Some("u".to_string()),
            lead: None,
        },
    );
    for (secs, field) in [(10, "c"), (20, "b"), (30, "a")] {
        source
            .push_version(
                RecordKind::Lead,
                "CRM-LEAD-0002",
                version(secs, "u", json!([[field, null, "v"]])),
            )
            .expect("push");
    }
    source
        .push_communication(RecordKind::Lead, "CRM-LEAD-0002", comm(15, "between"))
        .expect("push");

    let feed = get_activities(&source, "CRM-LEAD-0002").expect("feed");
    let types: Vec<ActivityType> = feed.iter().map(Activity::activity_type).collect();
    assert_eq!(
        types,
        [
            ActivityType::Added,
            ActivityType::Communication,
            ActivityType::Added,
            ActivityType::Creation,
        ]
    );
    assert_eq!(feed[0].other_versions().len(), 1);
    assert!(feed[2].other_versions.is_none());
}

#[test]
fn deal_edit_joining_lead_group_keeps_siblings_newest_first() {
    let mut source = MemorySource::new();
    source.set_fields(RecordKind::Lead, vec![def("email", "Email"), def("status", "Status")]);
    source.set_fields(RecordKind::Deal, vec![def("status", "Status")]);

    source.insert_record(
        RecordKind::Lead,
        "L",
        CoreFields {
            creation: ts(0),
            owner: Some("alice".to_string()),
            lead: None,
        },
    );
    for (secs, changed) in [
        (10, json!([["email", null, "x@y.z"]])),
        (12, json!([["status", "New", "Contacted"]])),
    ] {
        source
            .push_version(RecordKind::Lead, "L", version(secs, "bob", changed))
            .expect("push");
    }

    source.insert_record(
        RecordKind::Deal,
        "D",
        CoreFields {
            creation: ts(9),
            owner: Some("bob".to_string()),
            lead: Some("L".to_string()),
        },
    );
    source
        .push_version(
            RecordKind::Deal,
            "D",
            version(11, "bob", json!([["status", "Open", "Won"]])),
        )
        .expect("push");

    let feed = get_activities(&source, "D").expect("feed");
    assert_sorted(&feed);

    let head = &feed[0];
    assert_eq!((head.creation, head.is_lead), (ts(12), true));
    let siblings: Vec<(DateTime<Utc>, bool)> = head
        .other_versions()
        .iter()
        .map(|a| (a.creation, a.is_lead))
        .collect();
    assert_eq!(siblings, [(ts(11), false), (ts(10), true)]);
    assert_sorted(head.other_versions());
}

#[test]
fn removed_value_reports_prior_value() {
    let mut source = MemorySource::new();
    source.set_fields(RecordKind::Deal, vec![def("website", "Website")]);
    source.insert_record(
        RecordKind::Deal,
        "CRM-DEAL-0002",
        CoreFields {
            creation: ts(0),
            owner: None,
            lead: None,
        },
    );
    source
        .push_version(
            RecordKind::Deal,
            "CRM-DEAL-0002",
            version(5, "carol", json!([["website", "https://old.example", null]])),
        )
        .expect("push");

    let feed = get_activities(&source, "CRM-DEAL-0002").expect("feed");
    let ActivityData::FieldEdit(edit) = &feed[0].data else {
        panic!("expected a field edit, got {:?}", feed[0].data);
    };
    assert_eq!(
        edit.delta,
        FieldDelta::Removed {
            value: json!("https://old.example")
        }
    );
}

#[test]
fn unknown_name_is_not_found() {
    let source = converted_pair();
    let err = get_activities(&source, "nonexistent").expect_err("should fail");
    assert!(matches!(err, TimelineError::NotFound { .. }));
    assert_eq!(err.to_string(), "Document not found: nonexistent");
}

#[test]
fn strict_mode_rejects_broken_snapshot() {
    let mut source = converted_pair();
    source
        .push_version(
            RecordKind::Deal,
            "CRM-DEAL-0001",
            RawVersion {
                creation: ts(50),
                owner: Some("bob".to_string()),
                data: "{\"changed\": \"status\"}".to_string(),
            },
        )
        .expect("push");

    let lenient = Timeline::new(&source).get_activities("CRM-DEAL-0001");
    assert_eq!(lenient.expect("lenient feed").len(), 5);

    let strict = Timeline::new(&source)
        .with_decode_mode(DecodeMode::Strict)
        .get_activities("CRM-DEAL-0001");
    assert!(matches!(
        strict,
        Err(TimelineError::MalformedVersion {
            kind: RecordKind::Deal,
            ..
        })
    ));
}

#[test]
fn sqlite_store_yields_same_feed_as_memory() {
    let dir = tempfile::tempdir().expect("temp dir");
    let fixture_path = dir.path().join("fixture.json");
    std::fs::write(
        &fixture_path,
        json!({
            "fields": {
                "lead": [{"fieldname": "email", "label": "Email"}],
                "deal": [{"fieldname": "status", "label": "Status", "options": "Open\nWon"}]
            },
            "records": [
                {"kind": "lead", "name": "CRM-LEAD-0001",
                 "creation": "2024-03-01T10:00:00Z", "owner": "alice",
                 "versions": [
                     {"creation": "2024-03-02T10:00:00Z", "owner": "alice",
                      "data": {"changed": [["email", "", "x@y.z"]]}}
                 ]},
                {"kind": "deal", "name": "CRM-DEAL-0001",
                 "creation": "2024-03-05T10:00:00Z", "owner": "bob",
                 "lead": "CRM-LEAD-0001",
                 "versions": [
                     {"creation": "2024-03-06T10:00:00Z", "owner": "bob",
                      "data": {"changed": [["status", "Open", "Won"]]}}
                 ],
                 "communications": [
                     {"creation": "2024-03-07T10:00:00.250Z", "subject": "Signed",
                      "read_by_recipient": true}
                 ]}
            ]
        })
        .to_string(),
    )
    .expect("write fixture");

    let db_path = dir.path().join("crm.sqlite3");
    let mut conn = open_store(&db_path).expect("open store");
    load_fixture(&mut conn, &read_fixture(&fixture_path).expect("read fixture"))
        .expect("load fixture");
    let source = SqliteSource::from_connection(conn);

    let feed = get_activities(&source, "CRM-DEAL-0001").expect("feed");
    assert_sorted(&feed);
    let types: Vec<ActivityType> = feed.iter().map(Activity::activity_type).collect();
    assert_eq!(
        types,
        [
            ActivityType::Communication,
            ActivityType::Changed,
            ActivityType::Creation,
            ActivityType::Added,
            ActivityType::Creation,
        ]
    );
    assert_eq!(feed[0].creation.timestamp_subsec_millis(), 250);
    assert_eq!(feed[1].options(), Some("Open\nWon"));
    assert!(feed[3].is_lead);
}
