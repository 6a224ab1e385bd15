use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

const DATA_DIR_ENV: &str = "SUBITO_SEARCHER_DATA_DIR";
const TIMEOUT_ENV: &str = "SUBITO_SEARCHER_TIMEOUT_SECS";
const TELEGRAM_API_ENV: &str = "SUBITO_SEARCHER_TELEGRAM_API";
const MAX_PRODUCTS_ENV: &str = "SUBITO_SEARCHER_MAX_PRODUCTS";

const TIMEOUT_MIN: u64 = 1;
const TIMEOUT_MAX: u64 = 120;
const MAX_PRODUCTS_MIN: usize = 1;
const MAX_PRODUCTS_MAX: usize = 5000;

pub const QUERIES_FILE_NAME: &str = "searches.tracked";
pub const CREDENTIALS_FILE_NAME: &str = "telegram.credentials";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
pub const DEFAULT_REFRESH_DELAY_SECS: u64 = 120;
pub const DEFAULT_MAX_PRODUCTS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
    pub telegram_api: String,
    /// Upper bound on the seen-product links remembered per query.
    pub max_products: usize,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_pairs(std::env::vars())
    }

    pub(crate) fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env_map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        Ok(Self {
            data_dir: parse_data_dir(env_map.get(DATA_DIR_ENV).map(String::as_str)),
            timeout_secs: parse_timeout(env_map.get(TIMEOUT_ENV).map(String::as_str))?,
            telegram_api: parse_telegram_api(env_map.get(TELEGRAM_API_ENV).map(String::as_str)),
            max_products: parse_max_products(env_map.get(MAX_PRODUCTS_ENV).map(String::as_str))?,
        })
    }

    pub fn queries_file(&self) -> PathBuf {
        self.data_dir.join(QUERIES_FILE_NAME)
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE_NAME)
    }
}

fn parse_data_dir(raw: Option<&str>) -> PathBuf {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn parse_timeout(raw: Option<&str>) -> Result<u64, ConfigError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(DEFAULT_TIMEOUT_SECS);
    };

    let parsed = value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(value.to_string()))?;

    Ok(parsed.clamp(TIMEOUT_MIN, TIMEOUT_MAX))
}

fn parse_max_products(raw: Option<&str>) -> Result<usize, ConfigError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(DEFAULT_MAX_PRODUCTS);
    };

    let parsed = value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidMaxProducts(value.to_string()))?;

    Ok(parsed.clamp(MAX_PRODUCTS_MIN, MAX_PRODUCTS_MAX))
}

fn parse_telegram_api(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {TIMEOUT_ENV}: {0} (expected a whole number of seconds)")]
    InvalidTimeout(String),
    #[error("invalid {MAX_PRODUCTS_ENV}: {0} (expected a whole number)")]
    InvalidMaxProducts(String),
}
