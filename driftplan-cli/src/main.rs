//! CLI entry point for the driftplan schema comparison tool.
//! Provides clap-based routing for the compare and compare-livedb
//! subcommands and exit code mapping based on error type.

mod output;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;

use driftplan_core::config::{CliOverrides, DriftplanConfig};
use driftplan_core::error::DriftplanError;
use driftplan_core::model::ObjectKind;
use driftplan_core::{CompareReport, Driftplan};

/// Top-level CLI definition with global flags and subcommand dispatch.
#[derive(Parser)]
#[command(
    name = "driftplan",
    about = "Compare SQL schemas and print an ordered change plan",
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_HASH"), " ", env!("BUILD_TIME"), ")"
    ),
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<String>,

    /// Output the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Report renamed columns as a drop plus an add
    #[arg(long, global = true)]
    no_detect_renames: bool,

    /// Live introspection timeout in seconds (0 = no limit)
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

/// All available driftplan subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compare two sets of SQL files
    Compare {
        /// Source SQL file or directory (repeatable)
        #[arg(long, value_name = "PATH", required = true, num_args = 1..)]
        source: Vec<PathBuf>,

        /// Target SQL file or directory (repeatable)
        #[arg(long, value_name = "PATH", required = true, num_args = 1..)]
        target: Vec<PathBuf>,

        #[command(flatten)]
        compare: CompareArgs,
    },

    /// Compare a live PostgreSQL database against SQL files
    #[command(name = "compare-livedb")]
    CompareLivedb {
        /// Database URL (postgres:// or jdbc:postgresql://)
        #[arg(value_name = "URL")]
        url: String,

        /// Target SQL files or directories
        #[arg(value_name = "TARGET", required = true)]
        target: Vec<PathBuf>,

        /// Schema to introspect (default: public)
        #[arg(long, value_name = "SCHEMA")]
        schema: Option<String>,

        /// SSL/TLS mode: disable, prefer, require
        #[arg(long, value_name = "MODE")]
        ssl_mode: Option<String>,

        /// Number of retries when connecting to the database
        #[arg(long, value_name = "N")]
        connect_retries: Option<u32>,

        /// Connection timeout in seconds (default: 30, 0 = no timeout)
        #[arg(long, value_name = "SECS")]
        connect_timeout: Option<u32>,

        #[command(flatten)]
        compare: CompareArgs,
    },
}

/// Flags shared by both subcommands.
#[derive(clap::Args)]
struct CompareArgs {
    /// SQL dialect: postgres, mysql, sqlite, db2
    #[arg(long, value_name = "NAME")]
    dialect: Option<String>,

    /// Print only the operation list
    #[arg(long)]
    plan: bool,

    /// Object kinds to compare, comma-separated (e.g. table,view,index)
    #[arg(long, value_name = "LIST")]
    object_types: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or(filter))
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli).await {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

fn exit_code(error: &DriftplanError) -> i32 {
    match error {
        DriftplanError::ConfigError(_) => 2,
        DriftplanError::UnsupportedDialect { .. } => 2,
        DriftplanError::IntrospectionUnsupported { .. } => 2,
        DriftplanError::SourceNotFound { .. } => 3,
        DriftplanError::NoSqlFiles { .. } => 3,
        DriftplanError::IoError(_) => 3,
        DriftplanError::ConnectionError { .. } => 4,
        DriftplanError::DatabaseError(_) => 4,
    }
}

fn overrides_for(cli: &Cli) -> CliOverrides {
    let args = match &cli.command {
        Commands::Compare { compare, .. } | Commands::CompareLivedb { compare, .. } => compare,
    };

    let mut overrides = CliOverrides {
        dialect: args.dialect.clone(),
        object_types: args.object_types.as_deref().map(ObjectKind::parse_list),
        detect_renames: if cli.no_detect_renames { Some(false) } else { None },
        introspect_timeout: cli.timeout,
        ..Default::default()
    };

    if let Commands::CompareLivedb {
        url,
        schema,
        ssl_mode,
        connect_retries,
        connect_timeout,
        ..
    } = &cli.command
    {
        overrides.url = Some(url.clone());
        overrides.schema = schema.clone();
        overrides.ssl_mode = ssl_mode.clone();
        overrides.connect_retries = *connect_retries;
        overrides.connect_timeout = *connect_timeout;
    }
    overrides
}

async fn run(cli: Cli) -> Result<(), DriftplanError> {
    let overrides = overrides_for(&cli);
    let config = DriftplanConfig::load(cli.config.as_deref(), &overrides)?;
    let driftplan = Driftplan::new(config);

    let (report, plan_only) = match &cli.command {
        Commands::Compare {
            source,
            target,
            compare,
        } => (driftplan.compare(source, target)?, compare.plan),
        Commands::CompareLivedb {
            target, compare, ..
        } => (driftplan.compare_livedb(target).await?, compare.plan),
    };

    print_report(&report, cli.json, plan_only, cli.quiet)
}

fn print_report(
    report: &CompareReport,
    json_output: bool,
    plan_only: bool,
    quiet: bool,
) -> Result<(), DriftplanError> {
    if json_output {
        let json = serde_json::to_string_pretty(report).map_err(std::io::Error::from)?;
        println!("{}", json);
    } else if plan_only {
        output::print_plan(report);
    } else {
        output::print_compare_report(report, quiet);
    }
    Ok(())
}

fn print_error(error: &DriftplanError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);

    // Provide actionable guidance
    match error {
        DriftplanError::ConfigError(_) | DriftplanError::UnsupportedDialect { .. } => {
            eprintln!(
                "{}",
                "Hint: Pass --dialect (postgres, mysql, sqlite, db2) or set dialect under [compare] in driftplan.toml."
                    .dimmed()
            );
        }
        DriftplanError::SourceNotFound { .. } | DriftplanError::NoSqlFiles { .. } => {
            eprintln!(
                "{}",
                "Hint: Paths may be .sql files or directories containing .sql files.".dimmed()
            );
        }
        DriftplanError::IntrospectionUnsupported { .. } => {
            eprintln!(
                "{}",
                "Hint: Dump the schema to SQL and use 'driftplan compare' instead.".dimmed()
            );
        }
        DriftplanError::ConnectionError { .. } | DriftplanError::DatabaseError(_) => {
            eprintln!(
                "{}",
                "Hint: Verify database is running and connection details are correct.".dimmed()
            );
        }
        _ => {}
    }
}
