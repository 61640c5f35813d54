//! Synap Cache CLI
//!
//! Inspect and maintain a file cache directory from the shell.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use synap_cache::{CacheConfig, FileCache};
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(name = "synap-cache-cli")]
#[command(about = "Read, write and maintain a Synap file cache", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache directory, overrides the one from --config
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value stored under a key
    Get { key: String },

    /// Store a value
    Set {
        key: String,
        value: String,

        /// Time to live in seconds
        #[arg(short, long, default_value_t = 3600)]
        ttl: u64,
    },

    /// Print the values of several keys
    Mget {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Delete keys
    Del {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Remove expired and corrupt records now
    Sweep,

    /// Remove every record in the directory
    Purge,

    /// Show the record file path for a key
    Path { key: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => CacheConfig::default(),
    };
    if let Some(dir) = cli.dir {
        config.file.directory = dir;
    }

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    debug!("Using cache directory {:?}", config.file.directory);
    let cache: FileCache<String, String> = config.build_file();

    let output = match cli.command {
        Commands::Get { key } => commands::get(&cache, &key),
        Commands::Set { key, value, ttl } => {
            commands::set(&cache, key, value, Duration::from_secs(ttl))
        }
        Commands::Mget { keys } => commands::mget(&cache, &keys),
        Commands::Del { keys } => commands::del(&cache, &keys),
        Commands::Sweep => commands::sweep(&cache),
        Commands::Purge => commands::purge(&cache),
        Commands::Path { key } => Ok(commands::path(&cache, &key)),
    }?;

    println!("{}", output);
    Ok(())
}
