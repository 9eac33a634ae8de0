//! Date-synchronized scanning.
//!
//! Advance a row stream to the first row dated on or after a target date and
//! leave that row in the stream for the next reader.

use super::error::IngestError;
use super::header::{FieldIndex, DELIMITER};
use super::rows::RowStream;
use crate::domain::DATE_FORMAT;
use chrono::NaiveDate;
use std::io::BufRead;

/// Column the scanner synchronizes on.
pub const DATE_FIELD: &str = "date";

/// Result of [`seek_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// First qualifying date; its row is still unread.
    Found(NaiveDate),
    /// No row on or after the target. The stream is exhausted.
    NotFound,
}

/// Seek to the first row whose date is `>= target`.
///
/// Rows before the target are consumed. The qualifying row is pushed back and
/// stays readable. Running out of rows is [`SeekOutcome::NotFound`], not an
/// error. A row without a date field, or with an unparsable one, aborts.
pub fn seek_to<R: BufRead>(
    stream: &mut RowStream<R>,
    target: NaiveDate,
) -> Result<SeekOutcome, IngestError> {
    seek_by(stream, DATE_FIELD, target)
}

/// [`seek_to`] against a differently named date column.
pub fn seek_by<R: BufRead>(
    stream: &mut RowStream<R>,
    date_field: &str,
    target: NaiveDate,
) -> Result<SeekOutcome, IngestError> {
    let offset = FieldIndex::parse(stream.header()?).offset_of(date_field)?;

    while let Some(row) = stream.next_row()? {
        let date = parse_date_field(&row, date_field, offset, stream.rows_read())?;
        if date >= target {
            stream.unread(row);
            return Ok(SeekOutcome::Found(date));
        }
    }
    Ok(SeekOutcome::NotFound)
}

/// Text of the field at `offset`, up to the next delimiter or end of row.
pub(crate) fn field_at(row: &str, offset: usize) -> Option<&str> {
    row.split(DELIMITER).nth(offset)
}

pub(crate) fn parse_date_field(
    row: &str,
    field: &str,
    offset: usize,
    row_number: usize,
) -> Result<NaiveDate, IngestError> {
    let text = field_at(row, offset).ok_or_else(|| IngestError::FieldNotFound {
        field: field.to_string(),
        line: row.to_string(),
    })?;
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| IngestError::Parse {
        field: field.to_string(),
        value: text.to_string(),
        row: row_number,
    })
}
