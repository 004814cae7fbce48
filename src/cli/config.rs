//! TOML configuration file support.
//!
//! Settings shared by every subcommand can live in a config file instead of
//! being repeated as flags:
//!
//! ```toml
//! # cycif-db.toml
//! [registry]
//! path = "markers/markers.tsv"
//!
//! [comparator]
//! fluor_sensitive = true
//! anti_sensitive = false
//! keep_duplicates = "keep"
//!
//! [ingest]
//! chunk_size = 10000
//! decimals = 4
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cycif_db::ingest::IngestOptions;
use cycif_db::markers::ComparatorContext;

/// Root configuration structure for cycif-db.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Marker registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Comparator sensitivity.
    #[serde(default)]
    pub comparator: ComparatorConfig,

    /// Ingestion tuning.
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Where the marker registry lives.
#[derive(Debug, Default, Deserialize)]
pub struct RegistryConfig {
    /// Path to the registry TSV file.
    pub path: Option<PathBuf>,
}

/// Sensitivity used when comparing and fusing keys.
#[derive(Debug, Default, Deserialize)]
pub struct ComparatorConfig {
    /// Compare fluorophores.
    pub fluor_sensitive: Option<bool>,

    /// Compare antibody hosts.
    pub anti_sensitive: Option<bool>,

    /// Replicate policy; only "keep" is supported.
    pub keep_duplicates: Option<String>,
}

/// Ingestion settings.
#[derive(Debug, Default, Deserialize)]
pub struct IngestConfig {
    /// Cell rows per bulk insert.
    pub chunk_size: Option<usize>,

    /// Decimal places kept for marker measurements.
    pub decimals: Option<u32>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load the given file, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Comparator context with unset values at their defaults.
    pub fn comparator_context(&self) -> Result<ComparatorContext> {
        let defaults = ComparatorContext::default();
        let c = &self.comparator;
        ComparatorContext::new(
            c.fluor_sensitive.unwrap_or(defaults.fluor_sensitive),
            c.anti_sensitive.unwrap_or(defaults.anti_sensitive),
            c.keep_duplicates
                .as_deref()
                .unwrap_or(defaults.keep_duplicates.as_str()),
        )
        .context("Invalid [comparator] configuration")
    }

    /// Ingestion options with unset values at their defaults.
    pub fn ingest_options(&self) -> IngestOptions {
        let defaults = IngestOptions::default();
        IngestOptions {
            chunk_size: self.ingest.chunk_size.unwrap_or(defaults.chunk_size),
            decimals: self.ingest.decimals.unwrap_or(defaults.decimals),
        }
    }
}
