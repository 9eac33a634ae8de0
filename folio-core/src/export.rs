//! Matrix export: CSV, JSON and Parquet.
//!
//! CSV is the default output of `folio align`: a `date` column followed by
//! one column per ticker, in input order.

use crate::data::AlignedMatrix;
use crate::domain::DATE_FORMAT;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(String),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination format for an aligned matrix.
pub trait MatrixSink {
    fn write_matrix(&self, matrix: &AlignedMatrix, out: &mut dyn Write) -> Result<(), ExportError>;
}

/// `date,T1,T2,...` header, then one row per trading date.
pub struct CsvSink;

impl MatrixSink for CsvSink {
    fn write_matrix(&self, matrix: &AlignedMatrix, out: &mut dyn Write) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_writer(out);

        let mut header = vec!["date"];
        header.extend(matrix.tickers().iter().map(|t| t.as_str()));
        wtr.write_record(&header)?;

        for (date, row) in matrix.dates().iter().zip(matrix.rows()) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(date.format(DATE_FORMAT).to_string());
            record.extend(row.iter().map(f64::to_string));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Pretty JSON of the serialized matrix.
pub struct JsonSink;

impl MatrixSink for JsonSink {
    fn write_matrix(&self, matrix: &AlignedMatrix, out: &mut dyn Write) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut *out, matrix)?;
        writeln!(out)?;
        Ok(())
    }
}

/// `date` (Date) plus one Float64 column per ticker.
pub fn to_dataframe(matrix: &AlignedMatrix) -> Result<DataFrame, ExportError> {
    let epoch = NaiveDate::default();
    let days: Vec<i32> = matrix
        .dates()
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(matrix.tickers().len() + 1);
    columns.push(
        Column::new("date".into(), days)
            .cast(&DataType::Date)
            .map_err(|e| ExportError::Parquet(format!("date cast: {e}")))?,
    );
    for (j, ticker) in matrix.tickers().iter().enumerate() {
        let values: Vec<f64> = matrix.rows().iter().map(|row| row[j]).collect();
        columns.push(Column::new(ticker.as_str().into(), values));
    }

    DataFrame::new(columns).map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))
}

/// Write the matrix as Parquet. Written to `.tmp` first, then renamed.
pub fn write_parquet(matrix: &AlignedMatrix, path: &Path) -> Result<(), ExportError> {
    let mut df = to_dataframe(matrix)?;
    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path)?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| ExportError::Parquet(format!("write parquet: {e}")))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ExportError::Io(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{assemble, AlignOptions, RowStream};
    use crate::domain::{DateRange, Ticker};
    use tempfile::TempDir;

    fn matrix() -> AlignedMatrix {
        let a = "Date,Close\n2018-01-02,10\n2018-01-03,11.5\n";
        let b = "Date,Close\n2018-01-02,20\n2018-01-03,21\n";
        let inputs = vec![
            (Ticker::new("JPM").unwrap(), RowStream::from_bytes(a.as_bytes())),
            (Ticker::new("BAC").unwrap(), RowStream::from_bytes(b.as_bytes())),
        ];
        let options = AlignOptions::new(DateRange::unbounded()).with_price_field("Close");
        assemble(inputs, &options).unwrap().matrix
    }

    #[test]
    fn csv_has_date_then_tickers_in_input_order() {
        let mut out = Vec::new();
        CsvSink.write_matrix(&matrix(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,JPM,BAC\n2018-01-02,10,20\n2018-01-03,11.5,21\n"
        );
    }

    #[test]
    fn json_round_trips() {
        let m = matrix();
        let mut out = Vec::new();
        JsonSink.write_matrix(&m, &mut out).unwrap();
        let back: AlignedMatrix = serde_json::from_slice(&out).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn dataframe_has_one_column_per_ticker() {
        let df = to_dataframe(&matrix()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("BAC").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn parquet_written_atomically() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("matrix.parquet");
        write_parquet(&matrix(), &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("parquet.tmp").exists());

        let file = fs::File::open(&path).unwrap();
        let df = ParquetReader::new(file).finish().unwrap();
        assert_eq!(df.height(), 2);
    }
}
