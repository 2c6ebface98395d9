//! `crmtl import`: load a JSON fixture of schemas and records into the store.

use super::CommandContext;
use crate::output::{pretty_kv, pretty_section, render_mode};
use clap::Args;
use crm_timeline_core::ErrorCode;
use crm_timeline_core::db::load::{LoadSummary, latest_version_at, read_fixture, record_count};
use crm_timeline_core::db::{load_fixture, open_store};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Fixture file (JSON) with `fields` and `records`.
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct ImportReport {
    store: String,
    loaded: LoadSummary,
    total_records: usize,
    latest_version: Option<String>,
}

pub fn run_import(args: &ImportArgs, ctx: &CommandContext) -> anyhow::Result<()> {
    let fixture = match read_fixture(&args.file) {
        Ok(fixture) => fixture,
        Err(err) => return ctx.fail(ErrorCode::FixtureParseError, err),
    };

    let report = match import(ctx, &fixture) {
        Ok(report) => report,
        Err(err) => return ctx.fail(ErrorCode::StoreUnavailable, err),
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| {
            writeln!(
                w,
                "imported\t{}\t{}\t{}\t{}",
                r.loaded.records, r.loaded.versions, r.loaded.communications, r.loaded.fields
            )
        },
        |r, w| {
            pretty_section(w, "Import complete")?;
            pretty_kv(w, "store", &r.store)?;
            pretty_kv(w, "records", r.loaded.records.to_string())?;
            pretty_kv(w, "versions", r.loaded.versions.to_string())?;
            pretty_kv(w, "messages", r.loaded.communications.to_string())?;
            pretty_kv(w, "fields", r.loaded.fields.to_string())?;
            pretty_kv(w, "total", r.total_records.to_string())?;
            if let Some(latest) = &r.latest_version {
                pretty_kv(w, "latest edit", latest)?;
            }
            Ok(())
        },
    )
}

fn import(
    ctx: &CommandContext,
    fixture: &crm_timeline_core::db::Fixture,
) -> anyhow::Result<ImportReport> {
    let path = &ctx.config.store_path;
    let mut conn = open_store(path)?;
    let loaded = load_fixture(&mut conn, fixture)?;
    Ok(ImportReport {
        store: path.display().to_string(),
        loaded,
        total_records: record_count(&conn)?,
        latest_version: latest_version_at(&conn)?.map(|dt| dt.to_rfc3339()),
    })
}
