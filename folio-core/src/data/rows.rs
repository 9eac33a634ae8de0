//! Line-oriented row stream with a one-row push-back slot.
//!
//! The scanner needs to look at a row to decide whether it qualifies and then
//! leave it for the next reader. `unread` puts exactly that row back; the next
//! `next_row` returns it byte for byte.

use super::error::IngestError;
use super::header::trim_line_end;
use std::io::BufRead;

/// CSV text stream: a header row followed by data rows.
pub struct RowStream<R> {
    reader: R,
    header: Option<String>,
    pending: Option<String>,
    rows_read: usize,
}

impl<R: BufRead> RowStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            header: None,
            pending: None,
            rows_read: 0,
        }
    }

    /// The header row, read on first use and kept for later readers.
    pub fn header(&mut self) -> Result<&str, IngestError> {
        if self.header.is_none() {
            let line = self.read_line()?.ok_or(IngestError::EmptyInput)?;
            self.header = Some(line);
        }
        Ok(self.header.as_deref().unwrap_or_default())
    }

    /// Next data row without its line terminator, or `None` at end of stream.
    ///
    /// Blank lines are skipped.
    pub fn next_row(&mut self) -> Result<Option<String>, IngestError> {
        self.header()?;
        if let Some(row) = self.pending.take() {
            self.rows_read += 1;
            return Ok(Some(row));
        }
        loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    self.rows_read += 1;
                    return Ok(Some(line));
                }
            }
        }
    }

    /// Push `row` back so the next [`Self::next_row`] returns it.
    ///
    /// Only one row can be held at a time.
    pub fn unread(&mut self, row: String) {
        debug_assert!(self.pending.is_none(), "only one row may be un-read");
        self.rows_read = self.rows_read.saturating_sub(1);
        self.pending = Some(row);
    }

    /// 1-based number of the last data row handed out.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Whether a row is waiting in the push-back slot.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn read_line(&mut self) -> Result<Option<String>, IngestError> {
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        let len = trim_line_end(&buf).len();
        buf.truncate(len);
        Ok(Some(buf))
    }
}

impl<'a> RowStream<&'a [u8]> {
    /// Stream over an in-memory body.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}
