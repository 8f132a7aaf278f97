use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use log::{info, LevelFilter};
use photo_ingest_core::config::{ensure_directory, LogLevel};
use photo_ingest_core::progress::ConsoleProgress;
use photo_ingest_core::store::SqliteRecordStore;
use photo_ingest_core::{logging, Config, IngestPipeline};
use std::io::IsTerminal;
use std::path::PathBuf;

mod env;
mod prompt;

use env::{
    find_repo_root, normalize_path, update_dotenv_file, EnvSource, DROP_COLLECTION_ENV,
    PHOTOS_COLLECTION_ENV, PHOTOS_DB_ENV, PHOTOS_DIR_ENV,
};
use prompt::{default_photos_base_dir, prompt_for_path, resolve_clear, TerminalPrompter};

#[derive(Parser)]
#[command(name = "photo-ingest")]
#[command(about = "Flatten a photo directory and record its images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a photo directory with its images, flattened, and record them (the default)
    Ingest(IngestArgs),

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "photo-ingest.json")]
        path: PathBuf,
    },
}

#[derive(Args, Default)]
struct IngestArgs {
    /// Directory to ingest (overrides PHOTOS_DIR)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// SQLite database holding the records (overrides PHOTOS_DB)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Table receiving the records (overrides PHOTOS_COLLECTION)
    #[arg(long)]
    collection: Option<String>,

    /// Delete existing records before inserting
    #[arg(long, conflicts_with = "keep")]
    clear: bool,

    /// Keep existing records and append
    #[arg(long)]
    keep: bool,

    /// Write logs to rotating files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl IngestArgs {
    fn clear_flag(&self) -> Option<bool> {
        if self.clear {
            Some(true)
        } else if self.keep {
            Some(false)
        } else {
            None
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Ingest(args)) => ingest(args),
        None => ingest(IngestArgs::default()),

        Some(Commands::GenerateConfig { path }) => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    // Set up configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?,
        None => Config::default(),
    };
    if args.verbose > 0 {
        config.log_level = LogLevel::from_verbosity(args.verbose);
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    init_logging(&config, args.verbose)?;

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let env = EnvSource::load(&find_repo_root(&cwd))?;
    let interactive = prompt::stdin_is_interactive();

    config.source_dir = resolve_source_dir(&args, &env, &config, interactive)?;
    if let Some(database) = args
        .database
        .clone()
        .or_else(|| env.get(PHOTOS_DB_ENV).map(PathBuf::from))
    {
        config.database_path = database;
    }
    if let Some(collection) = args
        .collection
        .clone()
        .or_else(|| env.get(PHOTOS_COLLECTION_ENV))
    {
        config.collection = collection;
    }

    // Validate configuration
    config.validate()?;

    let store = SqliteRecordStore::open(&config.database_path, &config.collection)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let drop_value = env.get(DROP_COLLECTION_ENV);
    let decision = resolve_clear(
        args.clear_flag(),
        drop_value.as_deref(),
        config.clear_existing,
        interactive.then_some(TerminalPrompter),
    );
    let progress = if std::io::stdout().is_terminal() {
        ConsoleProgress::new()
    } else {
        ConsoleProgress::without_bar()
    };

    info!("Starting photo ingest...");
    let report = IngestPipeline::new(&config, store, decision, &progress)
        .run()
        .context("Error during ingest")?;
    info!(
        "Ingest complete: {} scanned, {} recorded, {} skipped",
        report.files_scanned, report.records_inserted, report.files_skipped
    );

    Ok(())
}

/// Console logs stay quiet unless asked for, since progress lines already
/// cover normal operation; file logs follow the configured level
fn init_logging(config: &Config, verbose: u8) -> anyhow::Result<()> {
    match &config.log_dir {
        Some(log_dir) => logging::init_logger(log_dir, config.log_level.to_level_filter())?,
        None => {
            let level = match verbose {
                0 => LevelFilter::Warn,
                _ => LogLevel::from_verbosity(verbose - 1).to_level_filter(),
            };
            env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .init();
        }
    }
    Ok(())
}

/// Flag, then environment and `.env`, then config file, then a prompt
fn resolve_source_dir(
    args: &IngestArgs,
    env: &EnvSource,
    config: &Config,
    interactive: bool,
) -> anyhow::Result<PathBuf> {
    let configured = args
        .source
        .clone()
        .or_else(|| env.get(PHOTOS_DIR_ENV).map(PathBuf::from))
        .or_else(|| (!config.source_dir.as_os_str().is_empty()).then(|| config.source_dir.clone()));

    let source_dir = match configured {
        Some(dir) => normalize_path(&dir)?,
        None => {
            if !interactive {
                bail!("PHOTOS_DIR is required. Define it in the environment or in .env.");
            }
            let default = default_photos_base_dir().join("fotos");
            let chosen = prompt_for_path(&mut TerminalPrompter, PHOTOS_DIR_ENV, &default)?
                .context("No usable PHOTOS_DIR given")?;
            let dotenv_path = env.dotenv_path();
            match update_dotenv_file(
                dotenv_path,
                &[(PHOTOS_DIR_ENV, chosen.display().to_string())],
            ) {
                Ok(()) => println!("Saved settings to {}", dotenv_path.display()),
                Err(e) => eprintln!("Warning: failed to write {}: {:#}", dotenv_path.display(), e),
            }
            chosen
        }
    };

    ensure_directory(&source_dir)
        .with_context(|| format!("Cannot use PHOTOS_DIR {}", source_dir.display()))?;
    Ok(source_dir)
}
