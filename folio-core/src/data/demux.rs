//! Multi-ticker stream framing.
//!
//! Without an output directory every body goes to one stream, each wrapped
//! in marker lines:
//!
//! ```text
//! begin:JPM
//! Date,Close
//! 2018-01-02,10
//! end:JPM
//! ```

use super::error::StoreError;
use crate::domain::Ticker;
use std::io::{BufRead, Write};

const BEGIN: &str = "begin:";
const END: &str = "end:";

/// Write one framed section. A body without a trailing newline gets one so
/// the end marker always starts its own line.
pub fn write_section<W: Write>(out: &mut W, ticker: &Ticker, body: &[u8]) -> Result<(), StoreError> {
    writeln!(out, "{BEGIN}{ticker}")?;
    out.write_all(body)?;
    if !body.is_empty() && !body.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    writeln!(out, "{END}{ticker}")?;
    Ok(())
}

/// Split a framed stream back into `(ticker, body)` pairs, in stream order.
///
/// Blank lines between sections are ignored. Anything else outside a section,
/// a nested `begin:`, a mismatched `end:` or a section left open at end of
/// input is an error.
pub fn read_sections<R: BufRead>(input: R) -> Result<Vec<(Ticker, Vec<u8>)>, StoreError> {
    let mut sections = Vec::new();
    let mut open: Option<(Ticker, Vec<u8>)> = None;

    for (i, line) in input.lines().enumerate() {
        let line = line?;
        let line_no = i + 1;
        let demux_err = |reason: String| StoreError::Demux {
            line: line_no,
            reason,
        };
        let trimmed = line.trim_end_matches('\r');

        match open.take() {
            None => {
                if trimmed.trim().is_empty() {
                    continue;
                }
                let name = trimmed
                    .strip_prefix(BEGIN)
                    .ok_or_else(|| demux_err(format!("expected '{BEGIN}TICKER', got '{trimmed}'")))?;
                let ticker = Ticker::new(name).map_err(|e| demux_err(e.to_string()))?;
                open = Some((ticker, Vec::new()));
            }
            Some((ticker, mut body)) => {
                if let Some(name) = trimmed.strip_prefix(END) {
                    if name != ticker.as_str() {
                        return Err(demux_err(format!(
                            "'{END}{name}' closes section '{ticker}'"
                        )));
                    }
                    sections.push((ticker, body));
                } else if trimmed.starts_with(BEGIN) {
                    return Err(demux_err(format!("section '{ticker}' is not closed")));
                } else {
                    body.extend_from_slice(trimmed.as_bytes());
                    body.push(b'\n');
                    open = Some((ticker, body));
                }
            }
        }
    }

    if let Some((ticker, _)) = open {
        return Err(StoreError::Demux {
            line: 0,
            reason: format!("section '{ticker}' is not closed at end of input"),
        });
    }
    Ok(sections)
}
