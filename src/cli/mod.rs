use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use cycif_db::markers::MarkerRegistry;

mod check;
mod config;
mod fuse;
mod headers;
mod ingest;
mod search;
mod update;

pub use config::Config;

/// cycif-db - marker registry and header normalization for CycIF data
#[derive(Parser)]
#[command(name = "cycif-db")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Marker registry TSV (overrides the config file)
    #[arg(short, long, value_name = "FILE", global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a cell table and its declared markers against the registry
    Check {
        /// Cell quantification CSV
        #[arg(value_name = "CELLS")]
        cells: PathBuf,

        /// Declared marker CSV (needs a `marker_name` column)
        #[arg(short, long, value_name = "FILE")]
        markers: Option<PathBuf>,

        /// Add unknown markers and features to a registry snapshot
        #[arg(long)]
        update: bool,

        /// Snapshot path for --update (default: `<registry>.new`)
        #[arg(short, long, value_name = "FILE", requires = "update")]
        output: Option<PathBuf>,
    },

    /// Show the canonical key of every header in a cell table
    Headers {
        /// Cell quantification CSV
        #[arg(value_name = "CELLS")]
        cells: PathBuf,

        /// Also print export labels for marker columns
        #[arg(long)]
        labels: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Search markers by name, fluorophore or antibody host
    Search {
        /// Case-insensitive substring
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Merge new markers, features and aliases into a registry snapshot
    UpdateRegistry {
        /// Registry-format TSV with the entries to merge
        #[arg(value_name = "ADDITIONS")]
        additions: PathBuf,

        /// Snapshot path (defaults to `<registry>.new`)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Fuse per-sample key lists into one ordered list
    Fuse {
        /// Comma-separated keys of one sample; repeat per sample
        #[arg(short, long = "keys", value_name = "KEYS", required = true)]
        key_lists: Vec<String>,

        /// `intersection` or `union`
        #[arg(short, long, default_value = "intersection")]
        mode: String,

        /// Print export labels next to keys
        #[arg(long)]
        labels: bool,
    },

    /// Ingest a sample complex into the in-memory store and report what was written
    Ingest {
        /// Cell quantification CSV
        #[arg(value_name = "CELLS")]
        cells: PathBuf,

        /// Declared marker CSV
        #[arg(value_name = "MARKERS")]
        markers: PathBuf,

        /// Sample name
        #[arg(short, long)]
        name: String,

        /// Sample tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Free-text annotation
        #[arg(long)]
        annotation: Option<String>,

        /// Roll back instead of committing
        #[arg(long)]
        dry_run: bool,

        /// Cell rows per bulk insert (overrides the config file)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Registry path from the flag, else from the config file
fn registry_path(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    flag.or_else(|| config.registry.path.clone())
        .context("No marker registry given; pass --registry or set [registry] path")
}

fn load_registry(path: &Path) -> Result<MarkerRegistry> {
    MarkerRegistry::load(path)
        .with_context(|| format!("Failed to load marker registry: {}", path.display()))
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let registry_file = registry_path(cli.registry, &config)?;

    match cli.command {
        Commands::Check {
            cells,
            markers,
            update,
            output,
        } => {
            let mut registry = load_registry(&registry_file)?;
            let update = update.then_some(output);
            check::run(&mut registry, cells, markers, update)
        }
        Commands::Headers {
            cells,
            labels,
            json,
        } => {
            let registry = load_registry(&registry_file)?;
            headers::run(&registry, cells, labels, json)
        }
        Commands::Search { query } => {
            let registry = load_registry(&registry_file)?;
            search::run(&registry, &query)
        }
        Commands::UpdateRegistry { additions, output } => {
            let mut registry = load_registry(&registry_file)?;
            update::run(&mut registry, additions, output)
        }
        Commands::Fuse {
            key_lists,
            mode,
            labels,
        } => {
            let registry = load_registry(&registry_file)?;
            let ctx = config.comparator_context()?;
            fuse::run(&registry, &key_lists, &mode, ctx, labels)
        }
        Commands::Ingest {
            cells,
            markers,
            name,
            tag,
            annotation,
            dry_run,
            chunk_size,
            json,
        } => {
            let registry = load_registry(&registry_file)?;
            let mut options = config.ingest_options();
            if let Some(chunk_size) = chunk_size {
                options.chunk_size = chunk_size;
            }
            let args = ingest::IngestArgs {
                cells,
                markers,
                name,
                tag,
                annotation,
                dry_run,
                json,
            };
            ingest::run(&registry, options, args)
        }
    }
}
