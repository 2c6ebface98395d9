//! `crmtl activities`: print the activity feed of a lead or deal.

use super::CommandContext;
use crate::output::{CliError, pretty_kv, pretty_section, render_error, render_mode};
use chrono::SecondsFormat;
use clap::Args;
use crm_timeline_core::model::{CommunicationData, FieldDelta};
use crm_timeline_core::{Activity, ActivityData, DecodeMode, Timeline};
use serde_json::Value;
use std::io::{self, Write};

#[derive(Args, Debug, Clone)]
pub struct ActivitiesArgs {
    /// Name of the lead or deal (deals take precedence).
    pub name: String,

    /// Fail on unreadable version snapshots instead of skipping them.
    #[arg(long)]
    pub strict: bool,

    /// Show at most this many top-level entries.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

pub fn run_activities(args: &ActivitiesArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let source = ctx.open_existing_store()?;
    let mode = if args.strict {
        DecodeMode::Strict
    } else {
        ctx.config.decode_mode
    };

    let mut feed = match Timeline::new(&source)
        .with_decode_mode(mode)
        .get_activities(&args.name)
    {
        Ok(feed) => feed,
        Err(err) => {
            render_error(ctx.output, &CliError::from(&err))?;
            return Err(err.into());
        }
    };
    if let Some(limit) = args.limit {
        feed.truncate(limit);
    }
    tracing::debug!(name = %args.name, entries = feed.len(), "rendering activity feed");

    render_mode(
        ctx.output,
        feed.as_slice(),
        |items, w| {
            for item in items {
                write_text_row(w, item, "")?;
                for sibling in item.other_versions() {
                    write_text_row(w, sibling, "+")?;
                }
            }
            Ok(())
        },
        |items, w| {
            pretty_section(w, &format!("Activity for {}", args.name))?;
            if items.is_empty() {
                return writeln!(w, "(no activity)");
            }
            for item in items {
                write_pretty_entry(w, item)?;
            }
            Ok(())
        },
    )
}

fn timestamp(activity: &Activity) -> String {
    activity
        .creation
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

const fn origin(activity: &Activity) -> &'static str {
    if activity.is_lead { "lead" } else { "deal" }
}

fn write_text_row(w: &mut dyn Write, activity: &Activity, marker: &str) -> io::Result<()> {
    writeln!(
        w,
        "{}\t{marker}{}\t{}\t{}\t{}",
        timestamp(activity),
        activity.activity_type(),
        activity.owner().unwrap_or("-"),
        origin(activity),
        summarize(activity)
    )
}

fn write_pretty_entry(w: &mut dyn Write, activity: &Activity) -> io::Result<()> {
    let who = match &activity.data {
        ActivityData::Communication(comm) => sender(comm).unwrap_or("someone").to_string(),
        _ => activity.owner().unwrap_or("someone").to_string(),
    };
    writeln!(
        w,
        "{}  [{}] {who} {}",
        timestamp(activity),
        origin(activity),
        summarize(activity)
    )?;
    for sibling in activity.other_versions() {
        writeln!(w, "{:>22}{}", "+ ", summarize(sibling))?;
    }
    if let ActivityData::Communication(comm) = &activity.data {
        if let Some(content) = comm.content.as_deref().filter(|c| !c.is_empty()) {
            pretty_kv(w, "    content", one_line(content))?;
        }
    }
    Ok(())
}

fn sender(comm: &CommunicationData) -> Option<&str> {
    comm.sender_full_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| comm.sender.as_deref().filter(|s| !s.is_empty()))
}

/// One-line description of an activity.
pub fn summarize(activity: &Activity) -> String {
    match &activity.data {
        ActivityData::Creation(text) => text.clone(),
        ActivityData::FieldEdit(edit) => {
            let value = display_value(edit.delta.value());
            match &edit.delta {
                FieldDelta::Changed { old_value, .. } => format!(
                    "changed {} from {} to {value}",
                    edit.field_label,
                    display_value(old_value)
                ),
                FieldDelta::Added { .. } => format!("set {} to {value}", edit.field_label),
                FieldDelta::Removed { .. } => {
                    format!("cleared {} (was {value})", edit.field_label)
                }
            }
        }
        ActivityData::Communication(comm) => {
            let subject = comm.subject.as_deref().unwrap_or("(no subject)");
            match sender(comm) {
                Some(from) => format!("email \"{}\" from {from}", one_line(subject)),
                None => format!("email \"{}\"", one_line(subject)),
            }
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => one_line(s),
        other => other.to_string(),
    }
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
