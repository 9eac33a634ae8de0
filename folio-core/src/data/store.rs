//! On-disk layout for fetched bodies.
//!
//! - One CSV file per ticker under a root directory
//! - Names come from [`build_filename`]
//! - Atomic writes (write to .tmp, rename into place)

use super::endpoint::{build_filename, ticker_from_filename};
use super::error::StoreError;
use super::rows::RowStream;
use crate::domain::{DateRange, Ticker};
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Make sure `dir` exists and is a directory, creating parents as needed.
pub fn ensure_root(dir: &Path) -> Result<(), StoreError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StoreError::NotADirectory(dir.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            debug!(path = %dir.display(), "created data directory");
            Ok(())
        }
        Err(source) => Err(StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Write `body` to its per-ticker file under `root` and return the path.
///
/// The root must already exist. An existing file for the same ticker and
/// range is replaced.
pub fn write_series_file(
    root: &Path,
    ticker: &Ticker,
    range: &DateRange,
    body: &[u8],
) -> Result<PathBuf, StoreError> {
    let path = build_filename(root, ticker, range);
    let tmp_path = path.with_extension("csv.tmp");

    let write_err = |source| StoreError::Write {
        path: tmp_path.clone(),
        source,
    };
    let mut file = File::create(&tmp_path).map_err(write_err)?;
    file.write_all(body).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(&tmp_path, &path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Write {
            path: path.clone(),
            source,
        }
    })?;

    debug!(%ticker, path = %path.display(), bytes = body.len(), "wrote series file");
    Ok(path)
}

/// Open a stored file as a row stream.
pub fn open_series_file(path: &Path) -> Result<RowStream<BufReader<File>>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(RowStream::new(BufReader::new(file)))
}

/// Open every path, pairing each stream with the ticker named by its file.
pub fn open_inputs(
    paths: &[PathBuf],
) -> Result<Vec<(Ticker, RowStream<BufReader<File>>)>, StoreError> {
    paths
        .iter()
        .map(|path| {
            let ticker = ticker_from_filename(path).ok_or_else(|| {
                StoreError::Manifest(format!("no ticker in file name {}", path.display()))
            })?;
            Ok((ticker, open_series_file(path)?))
        })
        .collect()
}
