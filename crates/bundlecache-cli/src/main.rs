//! bundlecache CLI - build and inspect bundle cache directories
//!
//! Commands:
//! - `bundlecache hash` - Build a hash list from a platform build directory
//! - `bundlecache encrypt` - Write a cipher-wrapped copy of a cache directory
//! - `bundlecache diff` - List files whose size differs from the hash list
//! - `bundlecache verify` - Check sizes, CRC32 and SHA-256 of every bundle
//! - `bundlecache inspect` - Print the contents of a hash list

use bundlecache_core::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod diff;
mod encrypt;
mod hash;
mod inspect;
mod verify;

#[derive(Parser)]
#[command(name = "bundlecache")]
#[command(author, version, about = "Build and inspect bundle cache directories", long_about = None)]
struct Cli {
    /// Log level written to stderr (trace, debug, info, warn, error, off)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a hash list from a platform build directory
    Hash {
        /// Directory holding the bundle files of one platform
        dir: PathBuf,

        /// Name of the master bundle
        #[arg(short, long, default_value = "master")]
        master: String,

        /// Source revision recorded in the hash list
        #[arg(short, long)]
        revision: String,

        /// Output path (default: <dir>/<hash file>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to a bundlecache.toml configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write an encrypted copy of a cache directory
    Encrypt {
        /// Plain cache root
        src: PathBuf,

        /// Destination root
        dst: PathBuf,

        /// Path to a bundlecache.toml configuration with an [encryption] table
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List files whose size differs from the hash list
    Diff {
        /// Cache root
        cache_dir: PathBuf,

        /// Platform key (e.g. android)
        #[arg(short, long)]
        platform: Option<String>,

        /// Path to a bundlecache.toml configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Exit with an error when any file differs
        #[arg(long)]
        check: bool,
    },

    /// Check size, CRC32 and SHA-256 of every bundle
    Verify {
        /// Cache root
        cache_dir: PathBuf,

        /// Platform key (e.g. android)
        #[arg(short, long)]
        platform: Option<String>,

        /// Path to a bundlecache.toml configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the contents of a hash list
    Inspect {
        /// Path to the hash-list file
        hash_list: PathBuf,

        /// Print the raw JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    bundlecache_logging::init_logging(LogLevel::parse(&cli.log_level).unwrap_or(LogLevel::Warn));

    match cli.command {
        Commands::Hash {
            dir,
            master,
            revision,
            output,
            config,
        } => {
            hash::run(&dir, &master, &revision, output, config.as_deref())?;
        }
        Commands::Encrypt { src, dst, config } => {
            encrypt::run(&src, &dst, &config)?;
        }
        Commands::Diff {
            cache_dir,
            platform,
            config,
            check,
        } => {
            diff::run(&cache_dir, platform.as_deref(), config.as_deref(), check)?;
        }
        Commands::Verify {
            cache_dir,
            platform,
            config,
        } => {
            verify::run(&cache_dir, platform.as_deref(), config.as_deref())?;
        }
        Commands::Inspect { hash_list, json } => {
            inspect::run(&hash_list, json)?;
        }
    }

    Ok(())
}
