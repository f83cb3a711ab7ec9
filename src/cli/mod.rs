use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::local::FileKeyValueStore;
use crate::storage;

pub mod commands;

use self::commands::{AdminArgs, DeleteArgs, EditArgs, NewArgs, PinArgs, SearchArgs};

#[derive(Parser, Debug)]
#[command(
    name = "notesync",
    version,
    about = "Keyboard-first notes grouped by recency, with local pins and debounced sync"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTESYNC_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over NOTESYNC_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error); defaults to RUST_LOG, then info
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Create a private note owned by this session
    New(NewArgs),
    /// Print every visible note grouped by bucket
    List,
    /// Print notes whose title or content contains the query
    Search(SearchArgs),
    /// Toggle the local pin on a note
    Pin(PinArgs),
    /// Update fields of a note this session owns
    Edit(EditArgs),
    /// Delete a note this session owns
    Delete(DeleteArgs),
    /// Print this machine's session identity
    Session,
    /// Administrator commands (requires the configured admin secret)
    Admin(AdminArgs),
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

    let level = cli
        .log_level
        .or_else(|| env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());
    let log_file = paths.log_dir.join("notesync.log");
    let target = match command {
        Commands::Tui => LogTarget::File(&log_file),
        _ => LogTarget::Stderr,
    };
    init_tracing(&level, target)
        .with_context(|| format!("initialising logging at level {level}"))?;

    let config = Arc::new(loader.load_or_init()?);
    let storage = storage::init(&paths, &config.storage)?;
    let mut kv = FileKeyValueStore::open_in(&paths.state_dir)?;

    match command {
        Commands::Tui => {
            let mut app = App::new(config, storage, Box::new(kv))?;
            app.run()
        }
        Commands::New(args) => {
            let args = args.with_piped_content()?;
            print!("{}", commands::new_note(&storage, &mut kv, &config, &args)?);
            Ok(())
        }
        Commands::List => {
            print!("{}", commands::list_notes(&storage, &mut kv, &config)?);
            Ok(())
        }
        Commands::Search(args) => {
            print!("{}", commands::search_notes(&storage, &mut kv, &args)?);
            Ok(())
        }
        Commands::Pin(args) => {
            print!("{}", commands::toggle_pin(&storage, &mut kv, &config, &args)?);
            Ok(())
        }
        Commands::Edit(args) => {
            print!("{}", commands::edit_note(&storage, &mut kv, &config, &args)?);
            Ok(())
        }
        Commands::Delete(args) => {
            print!("{}", commands::delete_note(&storage, &mut kv, &args)?);
            Ok(())
        }
        Commands::Session => {
            println!("{}", crate::local::session_id(&mut kv)?);
            Ok(())
        }
        Commands::Admin(args) => {
            print!("{}", commands::run_admin(&storage, &config, args)?);
            Ok(())
        }
    }
}

fn init_tracing(level: &str, target: LogTarget<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}
