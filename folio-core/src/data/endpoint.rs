//! Request URLs and on-disk file names.
//!
//! Both are pure string assembly: nothing here touches the network or disk.

use crate::domain::{DateRange, Ticker, DATE_FORMAT};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Quandl WIKI dataset endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.quandl.com/api/v3/datasets/WIKI/";

/// Base of the dataset API. Always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base: &str) -> Self {
        let mut base = base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// `BASE/TICKER.csv?order=asc&api_key=TOKEN[&start_date=..][&end_date=..]`
///
/// `start_date` and `end_date` are appended independently of each other.
pub fn build_url(endpoint: &Endpoint, ticker: &Ticker, token: &str, range: &DateRange) -> String {
    let mut url = format!("{}{ticker}.csv?order=asc&api_key={token}", endpoint.base());
    if let Some(begin) = range.begin {
        url.push_str("&start_date=");
        url.push_str(&begin.format(DATE_FORMAT).to_string());
    }
    if let Some(end) = range.end {
        url.push_str("&end_date=");
        url.push_str(&end.format(DATE_FORMAT).to_string());
    }
    url
}

/// `root/TICKER.csv`, or `root/TICKER.begin.end.csv` when both dates are set.
///
/// A half-open range gets the undated name.
pub fn build_filename(root: &Path, ticker: &Ticker, range: &DateRange) -> PathBuf {
    let name = match (range.begin, range.end) {
        (Some(begin), Some(end)) => format!(
            "{ticker}.{}.{}.csv",
            begin.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        ),
        _ => format!("{ticker}.csv"),
    };
    root.join(name)
}

/// Recover the ticker from a file produced by [`build_filename`].
///
/// Suffixes are stripped from the right, so dotted tickers such as `BF.B`
/// survive. A file without the `.csv` extension falls back to its stem.
pub fn ticker_from_filename(path: &Path) -> Option<Ticker> {
    let name = path.file_name()?.to_str()?;
    let stem = match name.strip_suffix(".csv") {
        Some(stem) => strip_date_suffix(stem),
        None => path.file_stem()?.to_str()?,
    };
    Ticker::new(stem).ok()
}

/// Drop a trailing `.begin.end` pair of dates, if present.
fn strip_date_suffix(stem: &str) -> &str {
    let mut parts = stem.rsplitn(3, '.');
    let (Some(end), Some(begin), Some(ticker)) = (parts.next(), parts.next(), parts.next()) else {
        return stem;
    };
    let is_date = |s: &str| NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok();
    if is_date(begin) && is_date(end) && !ticker.is_empty() {
        ticker
    } else {
        stem
    }
}
