//! Folio Core: daily price ingestion for the Quandl WIKI dataset.
//!
//! This crate contains everything below the command line:
//! - Request URL and file name construction
//! - Streamed per-ticker fetches over a pluggable transport, optionally
//!   fanned out over a bounded worker pool
//! - Header indexing, date-synchronized scanning and column extraction
//! - Multi-ticker alignment into one date-by-ticker matrix
//! - On-disk storage, demultiplexed stream framing and the align manifest
//! - CSV, JSON and Parquet export

pub mod config;
pub mod data;
pub mod domain;
pub mod export;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across fetch workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Ticker>();
        require_sync::<domain::Ticker>();
        require_send::<domain::DateRange>();
        require_sync::<domain::DateRange>();
        require_send::<domain::PriceSeries>();
        require_sync::<domain::PriceSeries>();

        require_send::<data::Endpoint>();
        require_sync::<data::Endpoint>();
        require_send::<data::HttpTransport>();
        require_sync::<data::HttpTransport>();
        require_send::<data::FetchedBody>();
        require_sync::<data::FetchedBody>();
        require_send::<data::FetchError>();
        require_sync::<data::FetchError>();
        require_send::<data::AlignedMatrix>();
        require_sync::<data::AlignedMatrix>();

        require_send::<config::FolioConfig>();
        require_sync::<config::FolioConfig>();
    }
}
