//! Grouping of consecutive same-author field edits.
//!
//! The input is a feed already sorted newest first. A field-change activity
//! joins the pending group when the activity immediately before it in the
//! feed is also a field change by the same non-empty owner. Anything else
//! (a creation, a communication, an owner switch) closes the group.
//!
//! Adjacency is positional: a communication sitting between two edits by the
//! same user splits them into separate groups.

use crate::builder::sort_newest_first;
use crate::model::Activity;

/// Collapse adjacent same-owner field edits into grouped entries.
///
/// Order is preserved. A group of one is emitted unchanged; a larger group is
/// emitted as its first activity with the rest attached as `other_versions`.
#[must_use]
pub fn group_consecutive_edits(activities: Vec<Activity>) -> Vec<Activity> {
    let mut out = Vec::with_capacity(activities.len());
    // Non-empty exactly when the previous activity was a field change.
    let mut pending: Vec<Activity> = Vec::new();

    for activity in activities {
        if !activity.is_field_change() {
            flush(&mut pending, &mut out);
            out.push(activity);
            continue;
        }

        let joins = pending
            .last()
            .is_some_and(|prev| prev.owner().is_some() && prev.owner() == activity.owner());
        if !joins {
            flush(&mut pending, &mut out);
        }
        pending.push(activity);
    }

    flush(&mut pending, &mut out);
    out
}

fn flush(pending: &mut Vec<Activity>, out: &mut Vec<Activity>) {
    if let Some(head) = collapse(std::mem::take(pending)) {
        out.push(head);
    }
}

/// Fold a group into its head activity.
///
/// Siblings the head already carried from an earlier pass (a lead's feed
/// regrouped inside its deal's) are merged with the new ones newest first.
fn collapse(group: Vec<Activity>) -> Option<Activity> {
    let mut members = group.into_iter();
    let mut head = members.next()?;
    let rest: Vec<Activity> = members.collect();
    if rest.is_empty() {
        return Some(head);
    }

    let mut siblings = head.other_versions.take().unwrap_or_default();
    let mut regrouped = !siblings.is_empty();
    for mut member in rest {
        let nested = member.other_versions.take().unwrap_or_default();
        regrouped |= !nested.is_empty();
        siblings.push(member);
        siblings.extend(nested);
    }
    if regrouped {
        sort_newest_first(&mut siblings);
    }
    head.other_versions = Some(siblings);
    Some(head)
}
