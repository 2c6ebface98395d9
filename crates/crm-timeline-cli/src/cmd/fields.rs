//! `crmtl fields`: print the resolved field schema of a record kind.

use super::CommandContext;
use crate::output::{pretty_section, render_mode};
use clap::Args;
use crm_timeline_core::ErrorCode;
use crm_timeline_core::RecordKind;
use crm_timeline_core::schema::SchemaCache;
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub struct FieldsArgs {
    /// Record kind: `lead` or `deal`.
    pub kind: RecordKind,
}

#[derive(Debug, Clone, Serialize)]
struct FieldRow {
    fieldname: String,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<String>,
    /// Changes to this field never appear in the feed.
    suppressed: bool,
}

pub fn run_fields(args: &FieldsArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let source = ctx.open_existing_store()?;
    let mut cache = SchemaCache::new();
    let schema = match cache.resolve(&source, args.kind) {
        Ok(schema) => schema,
        Err(err) => return ctx.fail(ErrorCode::StoreUnavailable, err),
    };

    let suppressed = args.kind.suppressed_field();
    let rows: Vec<FieldRow> = schema
        .sorted()
        .into_iter()
        .map(|(name, meta)| FieldRow {
            fieldname: name.to_string(),
            label: schema.label_for(name).to_string(),
            options: meta.options.clone(),
            suppressed: name == suppressed,
        })
        .collect();

    render_mode(
        ctx.output,
        &rows,
        |rows, w| {
            for row in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}{}",
                    row.fieldname,
                    row.label,
                    row.options.as_deref().unwrap_or("-").replace('\n', "|"),
                    if row.suppressed { "\tsuppressed" } else { "" }
                )?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Fields of {}", args.kind))?;
            if rows.is_empty() {
                return writeln!(w, "(no fields defined)");
            }
            for row in rows {
                let marker = if row.suppressed { " (hidden from feed)" } else { "" };
                writeln!(w, "{:<24} {}{marker}", row.fieldname, row.label)?;
            }
            Ok(())
        },
    )
}
