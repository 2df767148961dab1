//! Configuration management for the dataset generator.
//!
//! This module provides configuration loading from both base configuration file
//! and environment variables. Environment variables override the base configuration
//! and use the prefix `BANKDATAGEN_`.

use core::num::NonZeroUsize;

use bank_datagen_store::TlsMode;
use chrono::{DateTime, Utc};
use config::{ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Loads the application configuration from base config and environment variables.
///
/// Environment variables use double underscores `__` to denote nested keys.
/// For example, `BANKDATAGEN_GENERATION__CUSTOMERS` corresponds to `generation.customers`.
///
/// # Errors
///
/// If the configuration could not be loaded or parsed
pub fn get_configuration() -> Result<Config, ConfigError> {
    config::Config::builder()
        .add_source(File::from_str(include_str!("base_config.ron"), FileFormat::Ron))
        .add_source(
            Environment::with_prefix(Config::CONFIG_ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

/// Root configuration structure containing all application settings.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// How much to generate
    pub generation: GenerationConfig,

    /// Where the generated dataset goes
    pub output: OutputConfig,

    /// Database configuration, used with [`OutputKind::Postgres`]
    pub db: DbConfig,
}

/// Generation volume and reproducibility settings.
#[derive(Debug, Deserialize)]
pub struct GenerationConfig {
    /// Number of new customers
    pub customers: usize,

    /// Number of existing customers updated once
    pub customer_updates: usize,

    /// Number of transactions
    pub transactions: usize,

    /// Seed making the run reproducible; OS entropy when absent
    pub seed: Option<u64>,

    /// Earliest customer creation instant (RFC 3339); start of 2024 when absent
    pub epoch_floor: Option<DateTime<Utc>>,
}

/// Output destination settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// The destination kind
    pub kind: OutputKind,

    /// Directory receiving one `<table>.csv` per table, used with [`OutputKind::Csv`]
    pub csv_dir: String,
}

/// Where the generated rows are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Insert into the PostgreSQL audit tables.
    Postgres,

    /// Generate in memory, then export every table as CSV.
    Csv,
}

/// Database configuration settings.
#[derive(Debug, Deserialize)]
pub struct DbConfig {
    /// The database connection URL
    pub db_url: String,

    /// Maximum number of database connections in the pool
    pub max_conn: NonZeroUsize,

    /// Whether to connect over TLS verified against the native root certificates
    pub tls: bool,
}

impl Config {
    const CONFIG_ENV_PREFIX: &str = "BANKDATAGEN";
}

impl DbConfig {
    /// Returns the TLS mode of pooled connections.
    pub fn tls_mode(&self) -> TlsMode {
        if self.tls { TlsMode::NativeRoots } else { TlsMode::Disabled }
    }
}
