#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::CommandContext;
use crm_timeline_core::ErrorCode;
use crm_timeline_core::config::{ConfigOverrides, resolve_config};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "crmtl: activity timelines for CRM leads and deals",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (shorthand for `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Record store to read (overrides config and CRM_TIMELINE_DB).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Output mode to use before (or without) a resolved config.
    fn fallback_output(&self) -> OutputMode {
        if self.json {
            return OutputMode::Json;
        }
        if let Some(mode) = self.format {
            return mode;
        }
        if std::io::stdout().is_terminal() {
            OutputMode::Pretty
        } else {
            OutputMode::Text
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Show the activity feed of a lead or deal",
        long_about = "Show the newest-first activity feed of a lead or deal: its creation, \
                      field changes, and communications. A deal converted from a lead \
                      includes the lead's history.",
        after_help = "EXAMPLES:\n    # Feed of a deal\n    crmtl activities CRM-DEAL-2024-0001\n\n    # Fail on unreadable snapshots\n    crmtl activities CRM-LEAD-2024-0007 --strict\n\n    # Emit machine-readable output\n    crmtl activities CRM-DEAL-2024-0001 --json"
    )]
    Activities(cmd::activities::ActivitiesArgs),

    #[command(
        about = "Show the field schema of a record kind",
        after_help = "EXAMPLES:\n    # Deal fields\n    crmtl fields deal\n\n    # Emit machine-readable output\n    crmtl fields lead --json"
    )]
    Fields(cmd::fields::FieldsArgs),

    #[command(
        about = "Load schemas and records from a JSON fixture",
        long_about = "Load field schemas and records (with their version snapshots and \
                      communications) from a JSON fixture into the record store, \
                      replacing records that already exist.",
        after_help = "EXAMPLES:\n    # Seed a store\n    crmtl --db crm.sqlite3 import fixture.json"
    )]
    Import(cmd::import::ImportArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CRM_TIMELINE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "crm_timeline=debug,info"
        } else {
            "crm_timeline=info,warn"
        })
    });

    let format = env::var("CRM_TIMELINE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn context(cli: &Cli) -> anyhow::Result<CommandContext> {
    let cwd = env::current_dir()?;
    let overrides = ConfigOverrides {
        config_path: cli.config.as_deref(),
        db_path: cli.db.as_deref(),
        json: cli.json,
        format: cli.format.map(OutputMode::as_str),
    };
    let config = resolve_config(&overrides, &cwd)?;
    let output = OutputMode::from_resolved(&config.resolved_output);
    Ok(CommandContext { config, output })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let ctx = match context(&cli) {
        Ok(ctx) => ctx,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            let rendered = render_error(
                cli.fallback_output(),
                &CliError::with_details(
                    format!("{err:#}"),
                    code.hint().unwrap_or_else(|| code.message()),
                    code.code(),
                ),
            );
            if rendered.is_err() {
                eprintln!("error: {err:#}");
            }
            return ExitCode::FAILURE;
        }
    };
    debug!(store = %ctx.config.store_path.display(), output = ctx.output.as_str(), "starting");

    let result = match &cli.command {
        Commands::Activities(args) => cmd::activities::run_activities(args, &ctx),
        Commands::Fields(args) => cmd::fields::run_fields(args, &ctx),
        Commands::Import(args) => cmd::import::run_import(args, &ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = %format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_timeline_core::RecordKind;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["crmtl", "activities", "CRM-DEAL-0001", "--json"]);
        assert!(cli.json);
        assert_eq!(cli.fallback_output(), OutputMode::Json);
    }

    #[test]
    fn json_flag_wins_over_format() {
        let cli = Cli::parse_from(["crmtl", "--json", "--format", "text", "fields", "lead"]);
        assert_eq!(cli.fallback_output(), OutputMode::Json);

        let cli = Cli::parse_from(["crmtl", "--format", "text", "fields", "lead"]);
        assert_eq!(cli.fallback_output(), OutputMode::Text);
    }

    #[test]
    fn global_store_flags_parse() {
        let cli = Cli::parse_from([
            "crmtl",
            "--db",
            "crm.sqlite3",
            "--config",
            "alt.toml",
            "activities",
            "X",
        ]);
        assert_eq!(cli.db, Some(PathBuf::from("crm.sqlite3")));
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn activities_args_parse() {
        let cli = Cli::parse_from(["crmtl", "activities", "CRM-LEAD-0001", "--strict", "-n", "5"]);
        let Commands::Activities(args) = cli.command else {
            panic!("expected activities");
        };
        assert_eq!(args.name, "CRM-LEAD-0001");
        assert!(args.strict);
        assert_eq!(args.limit, Some(5));
    }

    #[test]
    fn fields_kind_is_parsed() {
        let cli = Cli::parse_from(["crmtl", "fields", "Deal"]);
        let Commands::Fields(args) = cli.command else {
            panic!("expected fields");
        };
        assert_eq!(args.kind, RecordKind::Deal);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["crmtl", "fields", "contact"]).is_err());
    }

    #[test]
    fn all_subcommands_parse() {
        let subcommands = [
            vec!["crmtl", "activities", "x"],
            vec!["crmtl", "fields", "lead"],
            vec!["crmtl", "import", "fixture.json"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }
}
