//! Domain types: tickers, request windows, price series.

pub mod series;
pub mod ticker;

pub use series::{parse_date, DateRange, PriceSeries, DATE_FORMAT};
pub use ticker::Ticker;
