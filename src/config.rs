use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Password env var consulted when the config file carries none.
pub const PASSWORD_ENV_VAR: &str = "RATEMART_WAREHOUSE_PASSWORD";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "https://api.exchangeratesapi.io".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WarehouseConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
}

impl WarehouseConfig {
    /// Connection password: the config value, falling back to the
    /// environment so credentials can stay out of the file.
    pub fn password(&self) -> Option<String> {
        self.password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV_VAR).ok())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_start_year() -> i32 {
    1999
}

fn default_min_rows() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    pub warehouse: WarehouseConfig,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// First year requested from the rate service; the fetcher advances
    /// past it when the service has no data that far back.
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    /// Minimum row count every table must reach for the run to pass.
    #[serde(default = "default_min_rows")]
    pub min_rows: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "dmrib", "ratemart")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Directory the extraction stage unloads rate CSVs into.
    pub fn currencies_dir(&self) -> PathBuf {
        self.data_path().join("currencies")
    }

    /// Static currency reference file; its row count is the exact-load
    /// expectation for the currency dimension.
    pub fn currency_meta_file(&self) -> PathBuf {
        self.currencies_dir().join("currencies-meta.csv")
    }

    pub fn stocks_dir(&self) -> PathBuf {
        self.data_path().join("stocks")
    }

    pub fn etfs_dir(&self) -> PathBuf {
        self.data_path().join("etfs")
    }

    pub fn commodities_dir(&self) -> PathBuf {
        self.data_path().join("commodities")
    }

    pub fn commodities_source(&self) -> PathBuf {
        self.commodities_dir().join("commodity_trade_statistics.csv")
    }
}
