use chrono::{TimeZone, Utc};
use crm_timeline_core::Activity;
use crm_timeline_core::builder::sort_newest_first;
use crm_timeline_core::group::group_consecutive_edits;
use crm_timeline_core::model::{CommunicationData, FieldDelta, FieldEdit};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

const SIZES: [usize; 3] = [100, 1_000, 10_000];
const OWNERS: [&str; 3] = ["alice", "bob", "carol"];

/// Deterministic feed: runs of edits by rotating owners, with a
/// communication every seventh entry.
fn synthetic_feed(len: usize) -> Vec<Activity> {
    (0..len)
        .map(|i| {
            let secs = i64::try_from(i).unwrap_or(i64::MAX) * 60;
            let creation = Utc.timestamp_opt(secs, 0).single().unwrap_or_default();
            if i % 7 == 6 {
                Activity::communication(creation, CommunicationData::default(), false)
            } else {
                Activity::field_edit(
                    creation,
                    Some(OWNERS[(i / 4) % OWNERS.len()].to_string()),
                    FieldEdit {
                        field: format!("field_{}", i % 11),
                        field_label: format!("Field {}", i % 11),
                        delta: FieldDelta::Changed {
                            old_value: json!(i),
                            value: json!(i + 1),
                        },
                        options: None,
                    },
                    false,
                )
            }
        })
        .collect()
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline.grouping");

    for size in SIZES {
        let feed = synthetic_feed(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("sort", size), &feed, |b, feed| {
            b.iter(|| {
                let mut activities = feed.clone();
                sort_newest_first(&mut activities);
                black_box(activities)
            });
        });

        group.bench_with_input(BenchmarkId::new("group", size), &feed, |b, feed| {
            b.iter(|| black_box(group_consecutive_edits(feed.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_grouping);
criterion_main!(benches);
