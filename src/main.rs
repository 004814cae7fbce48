//! # cycif-db
//!
//! Command-line front end for the marker registry and header normalization
//! library.
//!
//! ## Usage
//!
//! ```bash
//! # Check a cell table against the registry
//! cycif-db -r markers.tsv check cells.csv --markers markers.csv
//!
//! # Show canonical keys for every header
//! cycif-db -r markers.tsv headers cells.csv --labels
//!
//! # Fuse two samples' marker columns
//! cycif-db -r markers.tsv fuse -k 56_cl,105_nu -k 105_nu,7_cl --mode union
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
