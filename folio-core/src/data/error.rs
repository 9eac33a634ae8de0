//! Structured error types for the ingestion pipeline.
//!
//! One enum per layer: transport, row parsing, alignment, filesystem.
//! All of them are displayable as a single diagnostic line in the CLI.

use crate::domain::Ticker;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Failure retrieving a ticker's body from the market-data endpoint.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport failure for {ticker}: {reason}")]
    Transport { ticker: Ticker, reason: String },

    #[error("HTTP {status} for {ticker}")]
    Status { ticker: Ticker, status: u16 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

impl FetchError {
    /// Ticker the failure belongs to, if any.
    pub fn ticker(&self) -> Option<&Ticker> {
        match self {
            Self::Transport { ticker, .. } | Self::Status { ticker, .. } => Some(ticker),
            Self::Client(_) | Self::Pool(_) => None,
        }
    }
}

/// Failure reading a CSV row stream.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input is empty (no header row)")]
    EmptyInput,

    #[error("field '{field}' not found in: {line}")]
    FieldNotFound { field: String, line: String },

    #[error("cannot parse {field} value '{value}' on data row {row}")]
    Parse {
        field: String,
        value: String,
        row: usize,
    },

    #[error("dates out of order: {next} does not follow {previous}")]
    UnorderedDates {
        previous: NaiveDate,
        next: NaiveDate,
    },

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure joining per-ticker series into one matrix.
#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("insufficient data for {ticker}: no row in the window starting {begin}")]
    InsufficientData { ticker: Ticker, begin: NaiveDate },

    #[error("{ticker} has no row for trading date {date}")]
    MissingTradingDay { ticker: Ticker, date: NaiveDate },

    #[error("{ticker}: {source}")]
    Ingest {
        ticker: Ticker,
        #[source]
        source: IngestError,
    },

    #[error("{0} appears more than once")]
    DuplicateTicker(Ticker),

    #[error("malformed matrix: {0}")]
    Malformed(String),

    #[error("no series left to align")]
    NoSeries,
}

impl AlignmentError {
    /// Ticker the failure belongs to, if any.
    pub fn ticker(&self) -> Option<&Ticker> {
        match self {
            Self::InsufficientData { ticker, .. }
            | Self::MissingTradingDay { ticker, .. }
            | Self::Ingest { ticker, .. }
            | Self::DuplicateTicker(ticker) => Some(ticker),
            Self::Malformed(_) | Self::NoSeries => None,
        }
    }
}

/// Filesystem and stream-framing failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed demultiplexed stream at line {line}: {reason}")]
    Demux { line: usize, reason: String },

    #[error("malformed manifest: {0}")]
    Manifest(String),
}
