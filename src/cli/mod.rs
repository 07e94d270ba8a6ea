use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

use self::commands::{AddArgs, ListArgs, TuiOptions};

#[derive(Parser, Debug)]
#[command(
    name = "loctui",
    version,
    about = "Keep a rated list of places, with distances, a map and stats"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over LOCTUI_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over LOCTUI_DATA)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Start the TUI from a query string such as `locId=...&txt=park&minRate=3`
    #[arg(long, global = true)]
    pub query: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Save a location from coordinates or an address lookup
    Add(AddArgs),
    /// Print stored locations using the given sort and filter
    List(ListArgs),
    /// Delete a location by id
    Remove {
        /// Location identifier
        id: String,
    },
    /// Print the rate and last-updated breakdowns
    Stats,
    /// Print the share link for a location
    Link {
        /// Location identifier
        id: String,
    },
}

enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();

    let command = cli.command.unwrap_or(Commands::Tui);
    let log_file = paths.log_dir.join("loctui.log");
    let target = match command {
        Commands::Tui => LogTarget::File(&log_file),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let config = loader.load_or_init()?;
    let storage = storage::init(&config.storage)?;
    tracing::debug!(db = %storage.database_path().display(), "storage ready");

    match command {
        Commands::Tui => commands::run_tui(
            &config,
            storage,
            TuiOptions {
                query: cli.query,
                session_file: paths.session_file.clone(),
            },
        ),
        Commands::Add(args) => commands::add_location(&config, &storage, args),
        Commands::List(args) => commands::list_locations(&storage, args),
        Commands::Remove { id } => commands::remove_location(&storage, &id),
        Commands::Stats => commands::print_stats(&config, &storage),
        Commands::Link { id } => commands::print_link(&config, &storage, &id),
    }
}

fn init_tracing(level: &str, target: LogTarget<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = fmt().with_env_filter(env_filter);
        match target {
            LogTarget::Stderr => builder.with_writer(std::io::stderr).init(),
            LogTarget::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}
