//! Subcommand handlers. Each handler renders its own errors and returns
//! `Err` so `main` only has to pick the exit code.

pub mod activities;
pub mod fields;
pub mod import;

use crate::output::{CliError, OutputMode, render_error};
use crm_timeline_core::ErrorCode;
use crm_timeline_core::config::EffectiveConfig;
use crm_timeline_core::db::SqliteSource;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: EffectiveConfig,
    pub output: OutputMode,
}

impl CommandContext {
    /// Open the configured store for reading. A missing file is an error
    /// rather than an empty store.
    pub fn open_existing_store(&self) -> anyhow::Result<SqliteSource> {
        let path = &self.config.store_path;
        let opened = if path.is_file() {
            SqliteSource::open(path)
        } else {
            Err(anyhow::anyhow!(
                "record store not found at {}",
                path.display()
            ))
        };
        opened.or_else(|err| self.fail(ErrorCode::StoreUnavailable, err))
    }

    /// Render `err` under `code` and hand it back for propagation.
    pub fn fail<T>(&self, code: ErrorCode, err: anyhow::Error) -> anyhow::Result<T> {
        let hint = code.hint().unwrap_or_else(|| code.message());
        render_error(
            self.output,
            &CliError::with_details(format!("{err:#}"), hint, code.code()),
        )?;
        Err(err)
    }
}
