//! Numeric column extraction.

use super::error::IngestError;
use super::header::FieldIndex;
use super::rows::RowStream;
use super::scan::{field_at, parse_date_field};
use crate::domain::{PriceSeries, Ticker};
use std::io::BufRead;

/// Every remaining row's value in column `field`, in row order.
///
/// The first empty or non-numeric value aborts with [`IngestError::Parse`].
pub fn extract_column<R: BufRead>(
    stream: &mut RowStream<R>,
    field: &str,
) -> Result<Vec<f64>, IngestError> {
    let offset = FieldIndex::parse(stream.header()?).offset_of(field)?;

    let mut values = Vec::new();
    while let Some(row) = stream.next_row()? {
        values.push(parse_value(&row, field, offset, stream.rows_read())?);
    }
    Ok(values)
}

/// Read the remaining rows as `(date, price)` pairs.
///
/// Same failure rules as [`extract_column`]; additionally the dates must be
/// strictly increasing.
pub fn read_series<R: BufRead>(
    stream: &mut RowStream<R>,
    ticker: Ticker,
    date_field: &str,
    price_field: &str,
) -> Result<PriceSeries, IngestError> {
    let index = FieldIndex::parse(stream.header()?);
    let date_offset = index.offset_of(date_field)?;
    let price_offset = index.offset_of(price_field)?;

    let mut points = Vec::new();
    while let Some(row) = stream.next_row()? {
        let n = stream.rows_read();
        let date = parse_date_field(&row, date_field, date_offset, n)?;
        let price = parse_value(&row, price_field, price_offset, n)?;
        points.push((date, price));
    }
    PriceSeries::new(ticker, points)
}

fn parse_value(row: &str, field: &str, offset: usize, row_number: usize) -> Result<f64, IngestError> {
    let text = field_at(row, offset).ok_or_else(|| IngestError::FieldNotFound {
        field: field.to_string(),
        line: row.to_string(),
    })?;
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| IngestError::Parse {
            field: field.to_string(),
            value: text.to_string(),
            row: row_number,
        })
}
