//! Run configuration.
//!
//! Settings can come from a TOML file and are then overridden field by field
//! by command-line flags. The credential itself never lives in the config:
//! the config only points at the file that holds it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::endpoint::Endpoint;
use crate::domain::{DateRange, Ticker};

/// Default date column name.
pub const DEFAULT_DATE_FIELD: &str = "Date";

/// Default price column name.
pub const DEFAULT_PRICE_FIELD: &str = "Adj. Close";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key file missing")]
    MissingApiKey,

    #[error("failed to read API key from {}: {reason}", .path.display())]
    UnreadableApiKey { path: PathBuf, reason: String },

    #[error("API key file is empty: {}", .0.display())]
    EmptyApiKey(PathBuf),

    #[error("must specify at least one stock symbol")]
    NoTickers,

    #[error("invalid ticker symbol: '{0}'")]
    InvalidTicker(String),

    #[error("ticker {0} is listed more than once")]
    DuplicateTicker(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("begin date {begin} is after end date {end}")]
    InvertedRange { begin: NaiveDate, end: NaiveDate },

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("read config file: {0}")]
    Read(String),

    #[error("parse config TOML: {0}")]
    Parse(String),
}

/// File-level settings. Every field is optional so a partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    /// File holding the market-data API key.
    pub api_key_file: Option<PathBuf>,
    /// Directory receiving `TICKER[.begin.end].csv` files. Absent means stream mode.
    pub output_dir: Option<PathBuf>,
    /// Window begin, `YYYY-MM-DD`.
    pub begin: Option<String>,
    /// Window end, `YYYY-MM-DD`.
    pub end: Option<String>,
    pub tickers: Vec<String>,
    /// Concurrent fetches. 1 fetches tickers one after another.
    pub workers: Option<usize>,
    /// Dataset endpoint, e.g. `https://www.quandl.com/api/v3/datasets/WIKI/`.
    pub base_url: Option<String>,
    /// Per-request timeout. Absent keeps the HTTP client's default.
    pub timeout_secs: Option<u64>,
    pub date_field: Option<String>,
    pub price_field: Option<String>,
}

impl FolioConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Canonicalized tickers, rejecting an empty list and repeats.
    ///
    /// `jpm` and `JPM` are the same ticker.
    pub fn tickers(&self) -> Result<Vec<Ticker>, ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }
        let tickers: Vec<Ticker> = self
            .tickers
            .iter()
            .map(|t| Ticker::new(t))
            .collect::<Result<_, _>>()?;
        let mut seen = HashSet::with_capacity(tickers.len());
        if let Some(dup) = tickers.iter().find(|t| !seen.insert(*t)) {
            return Err(ConfigError::DuplicateTicker(dup.to_string()));
        }
        Ok(tickers)
    }

    pub fn range(&self) -> Result<DateRange, ConfigError> {
        DateRange::parse(self.begin.as_deref(), self.end.as_deref())
    }

    pub fn workers(&self) -> Result<usize, ConfigError> {
        match self.workers {
            Some(0) => Err(ConfigError::NoWorkers),
            Some(n) => Ok(n),
            None => Ok(1),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.base_url
            .as_deref()
            .map(Endpoint::new)
            .unwrap_or_default()
    }

    pub fn date_field(&self) -> &str {
        self.date_field.as_deref().unwrap_or(DEFAULT_DATE_FIELD)
    }

    pub fn price_field(&self) -> &str {
        self.price_field.as_deref().unwrap_or(DEFAULT_PRICE_FIELD)
    }

    /// The API key read from `api_key_file`.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let path = self.api_key_file.as_deref().ok_or(ConfigError::MissingApiKey)?;
        load_api_key(path)
    }
}

/// Read an API key file, stripping surrounding whitespace and newlines.
pub fn load_api_key(path: &Path) -> Result<String, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::UnreadableApiKey {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let key = raw.trim();
    if key.is_empty() {
        return Err(ConfigError::EmptyApiKey(path.to_path_buf()));
    }
    Ok(key.to_string())
}
