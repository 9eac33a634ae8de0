//! Column resolution against a CSV header line.
//!
//! The market-data API does not promise a column order, so offsets are
//! resolved by name for every response.

use super::error::IngestError;

/// Field delimiter of the market-data CSV.
pub const DELIMITER: char = ',';

/// Drop a trailing `\n` or `\r\n`.
pub(crate) fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Zero-based offset of `field` within a comma-delimited header.
///
/// Fields are compared case-insensitively. A header with no delimiter is a
/// single column and is compared to `field` as-is.
pub fn index_of(header: &str, field: &str) -> Result<usize, IngestError> {
    FieldIndex::parse(header).offset_of(field)
}

/// Parsed header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    line: String,
    fields: Vec<String>,
}

impl FieldIndex {
    pub fn parse(header: &str) -> Self {
        let line = trim_line_end(header).to_string();
        let fields = line
            .split(DELIMITER)
            .map(|f| f.trim().to_string())
            .collect();
        Self { line, fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Number of delimiters in the header.
    pub fn delimiter_count(&self) -> usize {
        self.fields.len() - 1
    }

    /// Offset of `field`, never greater than [`Self::delimiter_count`].
    pub fn offset_of(&self, field: &str) -> Result<usize, IngestError> {
        let not_found = || IngestError::FieldNotFound {
            field: field.to_string(),
            line: self.line.clone(),
        };

        if self.fields.len() == 1 {
            return if self.line == field { Ok(0) } else { Err(not_found()) };
        }

        let offset = self
            .fields
            .iter()
            .position(|f| f.eq_ignore_ascii_case(field))
            .unwrap_or(self.fields.len());
        if offset > self.delimiter_count() {
            return Err(not_found());
        }
        Ok(offset)
    }
}
