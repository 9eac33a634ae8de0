//! Hand-off file between `fetch` and `align`.
//!
//! Line 1 is the begin date, line 2 the end date, and every remaining
//! whitespace-separated token is the path of a stored series file.

use super::error::StoreError;
use crate::domain::{parse_date, DateRange, DATE_FORMAT};
use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub begin: NaiveDate,
    pub end: NaiveDate,
    pub paths: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(range: &DateRange, paths: Vec<PathBuf>) -> Result<Self, StoreError> {
        match (range.begin, range.end) {
            (Some(begin), Some(end)) => Ok(Self { begin, end, paths }),
            _ => Err(StoreError::Manifest(
                "a manifest needs both a begin and an end date".into(),
            )),
        }
    }

    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let mut tokens = text.split_whitespace();
        let mut date = |which: &str| {
            let token = tokens
                .next()
                .ok_or_else(|| StoreError::Manifest(format!("missing {which} date")))?;
            parse_date(token).map_err(|e| StoreError::Manifest(format!("{which} date: {e}")))
        };
        let begin = date("begin")?;
        let end = date("end")?;
        if begin > end {
            return Err(StoreError::Manifest(format!(
                "begin date {begin} is after end date {end}"
            )));
        }
        let paths: Vec<PathBuf> = tokens.map(PathBuf::from).collect();
        if paths.is_empty() {
            return Err(StoreError::Manifest("no input files listed".into()));
        }
        Ok(Self { begin, end, paths })
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            begin: Some(self.begin),
            end: Some(self.end),
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<(), StoreError> {
        writeln!(out, "{}", self.begin.format(DATE_FORMAT))?;
        writeln!(out, "{}", self.end.format(DATE_FORMAT))?;
        for path in &self.paths {
            writeln!(out, "{}", path.display())?;
        }
        Ok(())
    }
}
