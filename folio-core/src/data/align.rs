//! Multi-ticker alignment.
//!
//! Each ticker's stream is synchronized to the requested begin date, the
//! latest first-qualifying date across tickers becomes the common start, and
//! the series are joined into one date-by-ticker matrix. Missing trading days
//! are an error: nothing is forward-filled or interpolated here.

use super::error::{AlignmentError, IngestError};
use super::extract::read_series;
use super::rows::RowStream;
use super::scan::{seek_by, SeekOutcome};
use crate::config::{DEFAULT_DATE_FIELD, DEFAULT_PRICE_FIELD};
use crate::domain::{DateRange, PriceSeries, Ticker};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::io::BufRead;
use tracing::{debug, info, warn};

/// What to do when one ticker cannot be aligned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignPolicy {
    /// Any failure aborts the whole assembly.
    #[default]
    AllOrNothing,
    /// Scan and parse failures drop the ticker and are reported alongside
    /// the matrix. Calendar mismatches between survivors still abort.
    Isolate,
}

/// Settings for [`assemble`].
#[derive(Debug, Clone)]
pub struct AlignOptions {
    pub range: DateRange,
    pub date_field: String,
    pub price_field: String,
    pub policy: AlignPolicy,
}

impl AlignOptions {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            date_field: DEFAULT_DATE_FIELD.to_string(),
            price_field: DEFAULT_PRICE_FIELD.to_string(),
            policy: AlignPolicy::default(),
        }
    }

    pub fn with_price_field(mut self, field: impl Into<String>) -> Self {
        self.price_field = field.into();
        self
    }

    pub fn with_date_field(mut self, field: impl Into<String>) -> Self {
        self.date_field = field.into();
        self
    }

    pub fn with_policy(mut self, policy: AlignPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Rows are trading dates, columns are tickers. Every cell is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct AlignedMatrix {
    tickers: Vec<Ticker>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

/// Unchecked wire form; deserialized matrices go through [`AlignedMatrix::try_from`].
#[derive(Deserialize)]
struct RawMatrix {
    tickers: Vec<Ticker>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl TryFrom<RawMatrix> for AlignedMatrix {
    type Error = AlignmentError;

    fn try_from(raw: RawMatrix) -> Result<Self, Self::Error> {
        check_unique(&raw.tickers)?;
        if raw.rows.len() != raw.dates.len() {
            return Err(AlignmentError::Malformed(format!(
                "{} rows for {} dates",
                raw.rows.len(),
                raw.dates.len()
            )));
        }
        if let Some(w) = raw.dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(AlignmentError::Malformed(format!(
                "date {} does not follow {}",
                w[1], w[0]
            )));
        }
        if let Some((i, row)) = raw
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != raw.tickers.len())
        {
            return Err(AlignmentError::Malformed(format!(
                "row {i} has {} values for {} tickers",
                row.len(),
                raw.tickers.len()
            )));
        }
        Ok(Self {
            tickers: raw.tickers,
            dates: raw.dates,
            rows: raw.rows,
        })
    }
}

fn check_unique<'a>(tickers: impl IntoIterator<Item = &'a Ticker>) -> Result<(), AlignmentError> {
    let mut seen = HashSet::new();
    for ticker in tickers {
        if !seen.insert(ticker) {
            return Err(AlignmentError::DuplicateTicker(ticker.clone()));
        }
    }
    Ok(())
}

impl AlignedMatrix {
    /// Join series that must already share one calendar.
    ///
    /// The union of all dates is the reference calendar; the first ticker
    /// lacking one of those dates is reported.
    pub fn from_series(series: Vec<PriceSeries>) -> Result<Self, AlignmentError> {
        if series.is_empty() {
            return Err(AlignmentError::NoSeries);
        }
        check_unique(series.iter().map(PriceSeries::ticker))?;

        let calendar: BTreeSet<NaiveDate> = series.iter().flat_map(|s| s.dates()).collect();
        for s in &series {
            if s.len() != calendar.len() {
                let own: BTreeSet<NaiveDate> = s.dates().collect();
                if let Some(date) = calendar.difference(&own).next() {
                    return Err(AlignmentError::MissingTradingDay {
                        ticker: s.ticker().clone(),
                        date: *date,
                    });
                }
            }
        }

        let dates: Vec<NaiveDate> = calendar.into_iter().collect();
        let rows = (0..dates.len())
            .map(|i| series.iter().map(|s| s.points()[i].1).collect())
            .collect();
        let tickers = series.iter().map(|s| s.ticker().clone()).collect();

        Ok(Self {
            tickers,
            dates,
            rows,
        })
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of trading dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// One ticker's prices, top to bottom.
    pub fn column(&self, ticker: &Ticker) -> Option<Vec<f64>> {
        let j = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.rows.iter().map(|row| row[j]).collect())
    }

    /// Deterministic BLAKE3 hash over tickers, dates and values.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for ticker in &self.tickers {
            hasher.update(ticker.as_str().as_bytes());
            hasher.update(b"\0");
        }
        for (date, row) in self.dates.iter().zip(&self.rows) {
            hasher.update(date.to_string().as_bytes());
            for value in row {
                hasher.update(&value.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Matrix plus the tickers that were dropped under [`AlignPolicy::Isolate`].
#[derive(Debug)]
pub struct Assembly {
    pub matrix: AlignedMatrix,
    /// Common start date every member was synchronized against.
    pub common_start: NaiveDate,
    pub failures: Vec<AlignmentError>,
}

impl Assembly {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Synchronize and join per-ticker streams.
///
/// 1. Every stream is scanned to `range.begin` (or its first row when the
///    range has no begin). A stream with no row inside the range is
///    [`AlignmentError::InsufficientData`].
/// 2. The remaining rows are read as a [`PriceSeries`].
/// 3. The common start is the latest first-qualifying date across tickers.
/// 4. Each series is cut to `[common start, range.end]` and the results must
///    share one calendar.
pub fn assemble<R: BufRead>(
    inputs: Vec<(Ticker, RowStream<R>)>,
    options: &AlignOptions,
) -> Result<Assembly, AlignmentError> {
    let target = options.range.begin.unwrap_or(NaiveDate::MIN);
    let mut failures = Vec::new();
    let mut synced: Vec<(PriceSeries, NaiveDate)> = Vec::with_capacity(inputs.len());

    for (ticker, mut stream) in inputs {
        match sync_one(&ticker, &mut stream, target, options) {
            Ok(pair) => synced.push(pair),
            Err(e) if options.policy == AlignPolicy::Isolate => {
                warn!(%ticker, "dropping from alignment: {e}");
                failures.push(e);
            }
            Err(e) => return Err(e),
        }
    }

    let common_start = synced
        .iter()
        .map(|(_, first)| *first)
        .max()
        .ok_or(AlignmentError::NoSeries)?;
    info!(
        %common_start,
        tickers = synced.len(),
        "common start across tickers"
    );

    let window = DateRange {
        begin: Some(common_start),
        end: options.range.end,
    };
    let series = synced
        .into_iter()
        .map(|(s, _)| s.restrict(&window))
        .collect();
    let matrix = AlignedMatrix::from_series(series)?;

    Ok(Assembly {
        matrix,
        common_start,
        failures,
    })
}

fn sync_one<R: BufRead>(
    ticker: &Ticker,
    stream: &mut RowStream<R>,
    target: NaiveDate,
    options: &AlignOptions,
) -> Result<(PriceSeries, NaiveDate), AlignmentError> {
    let wrap = |source: IngestError| AlignmentError::Ingest {
        ticker: ticker.clone(),
        source,
    };

    let first = match seek_by(stream, &options.date_field, target).map_err(wrap)? {
        SeekOutcome::Found(date) if options.range.end.map_or(true, |end| date <= end) => date,
        SeekOutcome::Found(_) | SeekOutcome::NotFound => {
            return Err(AlignmentError::InsufficientData {
                ticker: ticker.clone(),
                begin: target,
            })
        }
    };
    debug!(%ticker, %first, "first qualifying row");

    let series = read_series(
        stream,
        ticker.clone(),
        &options.date_field,
        &options.price_field,
    )
    .map_err(wrap)?;
    Ok((series, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DATE_FORMAT;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn t(s: &str) -> Ticker {
        Ticker::new(s).unwrap()
    }

    fn input<'a>(ticker: &str, body: &'a str) -> (Ticker, RowStream<&'a [u8]>) {
        (t(ticker), RowStream::from_bytes(body.as_bytes()))
    }

    fn opts(begin: &str, end: Option<&str>) -> AlignOptions {
        AlignOptions::new(DateRange::parse(Some(begin), end).unwrap()).with_price_field("Close")
    }

    const A: &str = "Date,Close\n2018-01-02,10\n2018-01-03,11\n2018-01-04,12\n2018-01-05,13\n";
    const B: &str = "Date,Close\n2018-01-03,20\n2018-01-04,21\n2018-01-05,22\n";
    const STALE: &str = "Date,Close\n2017-06-01,5\n2017-06-02,6\n";

    #[test]
    fn common_start_is_latest_first_date() {
        let assembly = assemble(vec![input("A", A), input("B", B)], &opts("2018-01-01", None)).unwrap();
        assert_eq!(assembly.common_start, d("2018-01-03"));
        let m = &assembly.matrix;
        assert_eq!(m.start_date(), Some(d("2018-01-03")));
        assert_eq!(m.len(), 3);
        assert_eq!(m.rows()[0], vec![11.0, 20.0]);
        assert_eq!(m.column(&t("B")).unwrap(), vec![20.0, 21.0, 22.0]);
        assert!(assembly.is_complete());
    }

    #[test]
    fn series_without_rows_in_window_names_ticker() {
        let err = assemble(
            vec![input("A", A), input("B", B), input("OLD", STALE)],
            &opts("2018-01-01", None),
        )
        .unwrap_err();
        match err {
            AlignmentError::InsufficientData { ticker, begin } => {
                assert_eq!(ticker.as_str(), "OLD");
                assert_eq!(begin, d("2018-01-01"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn end_date_truncates_rows() {
        let m = assemble(
            vec![input("A", A), input("B", B)],
            &opts("2018-01-01", Some("2018-01-04")),
        )
        .unwrap()
        .matrix;
        assert_eq!(m.dates(), &[d("2018-01-03"), d("2018-01-04")]);
    }

    #[test]
    fn missing_trading_day_is_an_error() {
        let gappy = "Date,Close\n2018-01-03,30\n2018-01-05,32\n";
        let err = assemble(vec![input("A", A), input("GAP", gappy)], &opts("2018-01-01", None))
            .unwrap_err();
        match err {
            AlignmentError::MissingTradingDay { ticker, date } => {
                assert_eq!(ticker.as_str(), "GAP");
                assert_eq!(date, d("2018-01-04"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn isolate_policy_drops_failing_ticker() {
        let broken = "Date,Close\n2018-01-03,x\n";
        let options = opts("2018-01-01", None).with_policy(AlignPolicy::Isolate);
        let assembly = assemble(
            vec![
                input("A", A),
                input("OLD", STALE),
                input("B", B),
                input("BAD", broken),
            ],
            &options,
        )
        .unwrap();
        assert_eq!(assembly.matrix.tickers(), &[t("A"), t("B")]);
        assert_eq!(assembly.failures.len(), 2);
        let dropped: Vec<&str> = assembly
            .failures
            .iter()
            .filter_map(|e| e.ticker().map(Ticker::as_str))
            .collect();
        assert_eq!(dropped, ["OLD", "BAD"]);
        assert!(matches!(assembly.failures[1], AlignmentError::Ingest { .. }));
    }

    #[test]
    fn isolate_with_no_survivors_is_no_series() {
        let options = opts("2018-01-01", None).with_policy(AlignPolicy::Isolate);
        assert!(matches!(
            assemble(vec![input("OLD", STALE)], &options),
            Err(AlignmentError::NoSeries)
        ));
    }

    #[test]
    fn parse_error_aborts_by_default() {
        let broken = "Date,Close\n2018-01-03,\n";
        let err = assemble(vec![input("A", A), input("BAD", broken)], &opts("2018-01-01", None))
            .unwrap_err();
        assert!(matches!(
            err,
            AlignmentError::Ingest {
                source: IngestError::Parse { .. },
                ..
            }
        ));
    }

    #[test]
    fn no_begin_starts_at_each_first_row() {
        let options = AlignOptions::new(DateRange::unbounded()).with_price_field("close");
        let assembly = assemble(vec![input("A", A), input("B", B)], &options).unwrap();
        assert_eq!(assembly.common_start, d("2018-01-03"));
    }

    #[test]
    fn fingerprint_is_stable_and_value_sensitive() {
        let m1 = assemble(vec![input("A", A), input("B", B)], &opts("2018-01-01", None))
            .unwrap()
            .matrix;
        let m2 = assemble(vec![input("A", A), input("B", B)], &opts("2018-01-01", None))
            .unwrap()
            .matrix;
        assert_eq!(m1.fingerprint(), m2.fingerprint());

        let b2 = "Date,Close\n2018-01-03,20\n2018-01-04,21.5\n2018-01-05,22\n";
        let m3 = assemble(vec![input("A", A), input("B", b2)], &opts("2018-01-01", None))
            .unwrap()
            .matrix;
        assert_ne!(m1.fingerprint(), m3.fingerprint());
    }

    #[test]
    fn empty_input_list_is_no_series() {
        let inputs: Vec<(Ticker, RowStream<&[u8]>)> = Vec::new();
        assert!(matches!(
            assemble(inputs, &opts("2018-01-01", None)),
            Err(AlignmentError::NoSeries)
        ));
    }

    #[test]
    fn first_row_after_end_is_insufficient_data() {
        let early = "Date,Close\n2018-01-02,1\n2018-01-03,2\n";
        let late = "Date,Close\n2018-01-10,3\n2018-01-11,4\n";
        let err = assemble(
            vec![input("A", early), input("B", late)],
            &opts("2018-01-01", Some("2018-01-05")),
        )
        .unwrap_err();
        match err {
            AlignmentError::InsufficientData { ticker, .. } => assert_eq!(ticker.as_str(), "B"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn first_row_on_end_date_still_qualifies() {
        let m = assemble(
            vec![input("A", A), input("B", B)],
            &opts("2018-01-01", Some("2018-01-03")),
        )
        .unwrap()
        .matrix;
        assert_eq!(m.dates(), &[d("2018-01-03")]);
    }

    #[test]
    fn repeated_ticker_is_rejected() {
        let err = assemble(vec![input("jpm", A), input("JPM", A)], &opts("2018-01-01", None))
            .unwrap_err();
        assert!(matches!(err, AlignmentError::DuplicateTicker(ref t) if t.as_str() == "JPM"));
    }

    #[test]
    fn deserialize_rejects_ragged_rows() {
        let json = r#"{"tickers":["A","B"],"dates":["2018-01-02","2018-01-03"],"rows":[[1.0,2.0],[3.0]]}"#;
        let err = serde_json::from_str::<AlignedMatrix>(json).unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 values"));
    }

    #[test]
    fn deserialize_rejects_row_count_mismatch_and_duplicates() {
        let short = r#"{"tickers":["A"],"dates":["2018-01-02","2018-01-03"],"rows":[[1.0]]}"#;
        assert!(serde_json::from_str::<AlignedMatrix>(short).is_err());
        let dup = r#"{"tickers":["A","a"],"dates":["2018-01-02"],"rows":[[1.0,2.0]]}"#;
        assert!(serde_json::from_str::<AlignedMatrix>(dup).is_err());
        let unordered = r#"{"tickers":["A"],"dates":["2018-01-03","2018-01-02"],"rows":[[1.0],[2.0]]}"#;
        assert!(serde_json::from_str::<AlignedMatrix>(unordered).is_err());
    }

    #[test]
    fn deserialize_accepts_well_formed_matrix() {
        let json = r#"{"tickers":["A","B"],"dates":["2018-01-02"],"rows":[[1.0,2.0]]}"#;
        let m: AlignedMatrix = serde_json::from_str(json).unwrap();
        assert_eq!(m.column(&t("B")).unwrap(), vec![2.0]);
    }
}
