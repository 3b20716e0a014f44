mod commands;
mod config;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_export, cmd_food_list, cmd_import, cmd_inspect, cmd_log_list, cmd_log_note, cmd_log_show,
    cmd_profile_add, cmd_profile_list, cmd_settings_set, cmd_settings_show,
};
use crate::config::{Config, Overrides};
use fitlog_core::db::{Database, LogDetails};

#[derive(Parser)]
#[command(
    name = "fitlog",
    version,
    about = "A local fitness log with MacroFactor spreadsheet import"
)]
struct Cli {
    /// Profile id to work on (default: $FITLOG_PROFILE or 1)
    #[arg(long, global = true)]
    profile: Option<i64>,
    /// Database file (default: $FITLOG_DB or the platform data directory)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a MacroFactor export (workbook file or directory of CSV sheets)
    Import {
        /// Path to the .xlsx/.xls/.ods file or a directory with "Quick Export.csv" / "Food Log.csv"
        path: PathBuf,
        /// Reconcile everything but keep no changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how an export would be read, without touching the database
    Inspect {
        /// Path to the workbook or CSV directory
        path: PathBuf,
    },
    /// Show and edit daily logs
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Custom foods created by imports
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Program start date and length
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Export daily logs as CSV
    Export {
        /// Output file, or "-" for stdout
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Show the log for a date (default: today)
    Show {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List daily logs, newest first
    List {
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Maximum number of logs when no range is given
        #[arg(short, long, default_value = "14")]
        limit: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the fields an import never writes
    Note {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Workout description
        #[arg(long)]
        workout: Option<String>,
        /// Body fat percentage
        #[arg(long)]
        fat_percent: Option<f64>,
        /// Sleep duration (e.g. "7h30")
        #[arg(long)]
        sleep_time: Option<String>,
        /// Sleep score
        #[arg(long)]
        sleep_score: Option<i64>,
        /// Strava activity link
        #[arg(long)]
        strava: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// List custom foods
    List {
        /// Search query to filter foods by name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show the program settings of the profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the program start date and length
    Set {
        /// First day of the program (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        start_date: String,
        /// Program length in days
        #[arg(long, default_value = "84")]
        total_days: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a profile
    Add {
        /// Username (stored trimmed and lowercased)
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fitlog={level},fitlog_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        profile, db, command, ..
    } = cli;
    let open = || -> Result<(Database, i64)> {
        let config = Config::load(Overrides {
            db_path: db,
            profile_id: profile,
        })?;
        tracing::debug!(db = %config.db_path.display(), profile = config.profile_id, "opening database");
        Ok((Database::open(&config.db_path)?, config.profile_id))
    };

    match command {
        // Reads the export only, so no database is opened.
        Commands::Inspect { path } => cmd_inspect(&path),
        Commands::Import {
            path,
            dry_run,
            json,
        } => {
            let (db, profile) = open()?;
            cmd_import(&db, profile, &path, dry_run, json)
        }
        Commands::Log { command } => {
            let (db, profile) = open()?;
            match command {
                LogCommands::Show { date, json } => cmd_log_show(&db, profile, date, json),
                LogCommands::List {
                    from,
                    to,
                    limit,
                    json,
                } => cmd_log_list(&db, profile, from, to, limit, json),
                LogCommands::Note {
                    date,
                    workout,
                    fat_percent,
                    sleep_time,
                    sleep_score,
                    strava,
                    json,
                } => {
                    let details = LogDetails {
                        fat_percent,
                        workout,
                        sleep_time,
                        sleep_score,
                        strava,
                    };
                    cmd_log_note(&db, profile, date, &details, json)
                }
            }
        }
        Commands::Food {
            command: FoodCommands::List { search, json },
        } => {
            let (db, _) = open()?;
            cmd_food_list(&db, search.as_deref(), json)
        }
        Commands::Settings { command } => {
            let (db, profile) = open()?;
            match command {
                SettingsCommands::Show { json } => cmd_settings_show(&db, profile, json),
                SettingsCommands::Set {
                    start_date,
                    total_days,
                    json,
                } => cmd_settings_set(&db, profile, &start_date, total_days, json),
            }
        }
        Commands::Profile { command } => {
            let (db, _) = open()?;
            match command {
                ProfileCommands::List { json } => cmd_profile_list(&db, json),
                ProfileCommands::Add { username, json } => cmd_profile_add(&db, &username, json),
            }
        }
        Commands::Export { path } => {
            let (db, profile) = open()?;
            cmd_export(&db, profile, &path)
        }
    }
}
