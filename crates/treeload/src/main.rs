//! Treeload launcher
//!
//! - `scan`: walk a directory tree and load every file into the database
//! - `init-db`: create the schema
//! - `check`: verify the database is reachable

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use treeload::cli::config::{default_logs_dir, ScanInputs};
use treeload::cli::error::{exit_code, persisted_before_failure, print_json_error, EXIT_SUCCESS};
use treeload::cli::{db, scan};
use treeload_logging::{init_logging, LogConfig};
use treeload_protocol::paths::default_database_url;

#[derive(Parser, Debug)]
#[command(name = "treeload", version, about = "Scan a directory tree and load it into a database")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Only warnings and errors on stderr
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover every file under ROOT and load it in batches
    Scan {
        /// Directory to scan (`~` and $VARS are expanded)
        root: String,

        /// Database URL (sqlite:<path>)
        #[arg(long, env = "TREELOAD_DATABASE_URL")]
        database: Option<String>,

        /// Records per transaction
        #[arg(short = 'b', long, env = "TREELOAD_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Files this size or larger are recorded without content (e.g. 512KB, 100MB)
        #[arg(long, env = "TREELOAD_MAX_CONTENT_SIZE")]
        max_content_size: Option<String>,

        /// Run identifier (UUID); generated when omitted
        #[arg(long)]
        run_id: Option<String>,

        /// Deployment tags, stored verbatim
        #[arg(long)]
        tags: Option<String>,

        /// Deployment label
        #[arg(long)]
        deployment: Option<String>,

        /// Deployment date (RFC 3339, "YYYY-MM-DD HH:MM:SS" or YYYY-MM-DD; UTC). Defaults to now
        #[arg(long)]
        deployment_date: Option<String>,

        /// TOML config file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Disable the progress spinner
        #[arg(long)]
        no_progress: bool,

        /// Output the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the database schema
    InitDb {
        /// Database URL (sqlite:<path>)
        #[arg(long, env = "TREELOAD_DATABASE_URL")]
        database: Option<String>,
    },

    /// Check the database connection
    Check {
        /// Database URL (sqlite:<path>)
        #[arg(long, env = "TREELOAD_DATABASE_URL")]
        database: Option<String>,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        matches!(self, Commands::Scan { json: true, .. })
    }

    /// The spinner owns stderr while it runs.
    fn draws_progress(&self) -> bool {
        matches!(
            self,
            Commands::Scan {
                no_progress: false,
                json: false,
                ..
            }
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    let _log_guard = match init_logging(LogConfig {
        app_name: "treeload",
        log_dir: default_logs_dir(),
        verbose: cli.verbose,
        quiet: cli.quiet || (cli.command.draws_progress() && !cli.verbose),
    }) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Warning: {:#}", err);
            None
        }
    };

    match run_command(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            if json_mode {
                print_json_error(&err);
            } else {
                eprintln!("{:#}", err);
                if let Some(persisted) = persisted_before_failure(&err) {
                    eprintln!("{} records were persisted before the failure", persisted);
                }
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match cli.command {
        Commands::Scan {
            root,
            database,
            batch_size,
            max_content_size,
            run_id,
            tags,
            deployment,
            deployment_date,
            config,
            no_progress,
            json,
        } => {
            let args = scan::ScanArgs {
                inputs: ScanInputs {
                    root,
                    database,
                    batch_size,
                    max_content_size,
                    run_id,
                    tags,
                    deployment,
                    deployment_date,
                    config,
                },
                no_progress,
                json,
            };
            runtime.block_on(scan::run(args))
        }
        Commands::InitDb { database } => {
            let url = database.unwrap_or_else(default_database_url);
            runtime.block_on(db::init_db(&url))
        }
        Commands::Check { database } => {
            let url = database.unwrap_or_else(default_database_url);
            runtime.block_on(db::check(&url))
        }
    }
}
