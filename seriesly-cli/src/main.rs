//! Seriesly CLI - Command-line interface for EPUB series metadata

mod commands;
mod config;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{Naming, Numbering};
use config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate jobs argument (must be at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "seriesly")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to settings.json in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Flags controlling how series tags are written
#[derive(Args)]
struct WriteFlags {
    /// Do not keep a .bak copy of the original file
    #[arg(long)]
    no_backup: bool,

    /// Do not write EPUB3 collection tags
    #[arg(long)]
    no_collection: bool,

    /// Do not write calibre tags
    #[arg(long)]
    no_calibre: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the series information of every book in a directory
    Scan {
        /// Directory to scan
        dir: PathBuf,

        /// Include subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Number of parallel jobs (must be at least 1)
        #[arg(short, long, value_parser = parse_jobs)]
        jobs: Option<usize>,
    },

    /// Display the metadata of one book
    Info {
        /// Input file path
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write or clear the series of one book
    Save {
        /// Input file path
        input: PathBuf,

        /// Series name (omit or leave empty to clear)
        #[arg(short, long)]
        series: Option<String>,

        /// Position in the series
        #[arg(short, long)]
        index: Option<String>,

        #[command(flatten)]
        write: WriteFlags,
    },

    /// Set the series of every book in a directory
    Batch {
        /// Directory containing the books
        dir: PathBuf,

        /// Include subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Series name for every book
        #[arg(short, long, required_unless_present = "series_from_folder")]
        series: Option<String>,

        /// Use each book's folder name as its series
        #[arg(long, conflicts_with = "series")]
        series_from_folder: bool,

        /// How to number books
        #[arg(short, long, value_enum, default_value_t = Numbering::None)]
        number: Numbering,

        /// First index for --number auto
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Show the planned changes without saving
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        write: WriteFlags,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "seriesly_cli=debug,seriesly_core=debug"
    } else {
        "seriesly_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            dir,
            recursive,
            json,
            jobs,
        } => commands::scan(
            &dir,
            recursive || settings.recursive,
            json,
            jobs.unwrap_or(settings.jobs),
        ),

        Commands::Info { input, json } => commands::info(&input, json),

        Commands::Save {
            input,
            series,
            index,
            write,
        } => {
            let options =
                settings.write_options(write.no_backup, write.no_collection, write.no_calibre);
            commands::save(&input, series.as_deref(), index.as_deref(), &options)
        }

        Commands::Batch {
            dir,
            recursive,
            series,
            series_from_folder,
            number,
            start,
            dry_run,
            write,
        } => {
            let naming = match series {
                Some(name) if !series_from_folder => Naming::Fixed(name),
                _ => Naming::FromFolder,
            };
            let options =
                settings.write_options(write.no_backup, write.no_collection, write.no_calibre);
            commands::batch(
                &dir,
                recursive || settings.recursive,
                &naming,
                number,
                start,
                dry_run,
                &options,
            )
        }
    }
}
