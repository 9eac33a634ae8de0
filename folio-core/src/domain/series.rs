use super::Ticker;
use crate::config::ConfigError;
use crate::data::error::IngestError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar date format used on the wire, in file names and in manifests.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| ConfigError::InvalidDate(s.to_string()))
}

/// Optional begin/end window of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(begin: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, ConfigError> {
        if let (Some(b), Some(e)) = (begin, end) {
            if b > e {
                return Err(ConfigError::InvertedRange { begin: b, end: e });
            }
        }
        Ok(Self { begin, end })
    }

    /// Both ends open.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Parse optional `YYYY-MM-DD` strings.
    pub fn parse(begin: Option<&str>, end: Option<&str>) -> Result<Self, ConfigError> {
        let begin = begin.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;
        Self::new(begin, end)
    }

    /// Both dates present.
    pub fn is_bounded(&self) -> bool {
        self.begin.is_some() && self.end.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.begin.map_or(true, |b| date >= b) && self.end.map_or(true, |e| date <= e)
    }
}

/// Daily prices of one ticker, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: Ticker,
    points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    /// Build a series, rejecting any date that does not strictly follow its predecessor.
    pub fn new(ticker: Ticker, points: Vec<(NaiveDate, f64)>) -> Result<Self, IngestError> {
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(IngestError::UnorderedDates {
                previous: w[0].0,
                next: w[1].0,
            });
        }
        Ok(Self { ticker, points })
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, p)| *p)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|(d, _)| *d)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Keep only the points inside `range`. Order is preserved.
    pub fn restrict(mut self, range: &DateRange) -> Self {
        self.points.retain(|(d, _)| range.contains(*d));
        self
    }
}
