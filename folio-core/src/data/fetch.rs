//! Fetch orchestration: one GET per ticker, optionally fanned out over a
//! bounded worker pool.

use super::endpoint::{build_url, Endpoint};
use super::error::FetchError;
use super::transport::{Transport, TransportFailure};
use crate::domain::{DateRange, Ticker};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Body of one ticker's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub ticker: Ticker,
    pub bytes: Vec<u8>,
}

/// Everything a fetch needs besides the transport and the ticker.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub endpoint: &'a Endpoint,
    pub token: &'a str,
    pub range: DateRange,
}

/// Progress callback for multi-ticker fetches.
pub trait FetchProgress: Send + Sync {
    /// Called when a ticker's request is issued.
    fn on_start(&self, ticker: &Ticker, index: usize, total: usize);

    /// Called when a ticker's request finishes, successfully or not.
    fn on_complete(
        &self,
        ticker: &Ticker,
        index: usize,
        total: usize,
        result: &Result<usize, FetchError>,
    );

    /// Called once the whole batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Reports progress through `tracing`.
pub struct TracingProgress;

impl FetchProgress for TracingProgress {
    fn on_start(&self, ticker: &Ticker, index: usize, total: usize) {
        info!("[{}/{}] fetching {ticker}", index + 1, total);
    }

    fn on_complete(
        &self,
        ticker: &Ticker,
        _index: usize,
        _total: usize,
        result: &Result<usize, FetchError>,
    ) {
        match result {
            Ok(bytes) => debug!(%ticker, bytes, "fetch complete"),
            Err(e) => warn!(%ticker, "fetch failed: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        info!("fetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// GET one ticker's CSV into a buffer owned by this call.
///
/// No retry is attempted; a failure is returned as-is.
pub fn fetch(
    transport: &dyn Transport,
    request: &FetchRequest<'_>,
    ticker: &Ticker,
) -> Result<Vec<u8>, FetchError> {
    let url = build_url(request.endpoint, ticker, request.token, &request.range);
    debug!(%ticker, url = %redact_key(&url, request.token), "GET");

    let mut buffer = Vec::new();
    transport
        .get(&url, &mut |chunk| buffer.extend_from_slice(chunk))
        .map_err(|failure| match failure {
            TransportFailure::Status(status) => FetchError::Status {
                ticker: ticker.clone(),
                status,
            },
            TransportFailure::Connect(reason) | TransportFailure::Read(reason) => {
                FetchError::Transport {
                    ticker: ticker.clone(),
                    reason,
                }
            }
        })?;
    Ok(buffer)
}

/// Fetch every ticker, `workers` at a time.
///
/// The result is in `tickers` order regardless of completion order. Any
/// failure fails the batch; tasks already running are allowed to finish
/// before the error is returned.
pub fn fetch_all(
    transport: &dyn Transport,
    request: &FetchRequest<'_>,
    tickers: &[Ticker],
    workers: usize,
    progress: &dyn FetchProgress,
) -> Result<Vec<FetchedBody>, FetchError> {
    let total = tickers.len();
    let fetch_one = |(i, ticker): (usize, &Ticker)| {
        progress.on_start(ticker, i, total);
        let result = fetch(transport, request, ticker);
        let report = result.as_ref().map(|b| b.len()).map_err(FetchError::clone);
        progress.on_complete(ticker, i, total, &report);
        result.map(|bytes| FetchedBody {
            ticker: ticker.clone(),
            bytes,
        })
    };

    let results: Vec<Result<FetchedBody, FetchError>> = if workers <= 1 {
        tickers.iter().enumerate().map(fetch_one).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("folio-fetch-{i}"))
            .build()
            .map_err(|e| FetchError::Pool(e.to_string()))?;
        pool.install(|| tickers.par_iter().enumerate().map(fetch_one).collect())
    };

    let failed = results.iter().filter(|r| r.is_err()).count();
    progress.on_batch_complete(total - failed, failed, total);

    // First failure in ticker order, so the reported error is deterministic.
    results.into_iter().collect()
}

fn redact_key(url: &str, token: &str) -> String {
    if token.is_empty() {
        return url.to_string();
    }
    url.replace(token, "***")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies split into fixed-size chunks.
    struct ChunkedTransport {
        bodies: HashMap<String, Vec<u8>>,
        chunk: usize,
        urls: Mutex<Vec<String>>,
    }

    impl ChunkedTransport {
        fn new(chunk: usize) -> Self {
            Self {
                bodies: HashMap::new(),
                chunk,
                urls: Mutex::new(Vec::new()),
            }
        }

        fn serve(mut self, ticker: &str, body: &str) -> Self {
            self.bodies.insert(ticker.to_string(), body.as_bytes().to_vec());
            self
        }
    }

    impl Transport for ChunkedTransport {
        fn get(&self, url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), TransportFailure> {
            self.urls.lock().unwrap().push(url.to_string());
            let ticker = url
                .rsplit('/')
                .next()
                .and_then(|s| s.split('.').next())
                .unwrap_or_default();
            let body = self.bodies.get(ticker).ok_or(TransportFailure::Status(404))?;
            for chunk in body.chunks(self.chunk.max(1)) {
                sink(chunk);
            }
            Ok(())
        }
    }

    struct Silent;

    impl FetchProgress for Silent {
        fn on_start(&self, _: &Ticker, _: usize, _: usize) {}
        fn on_complete(&self, _: &Ticker, _: usize, _: usize, _: &Result<usize, FetchError>) {}
        fn on_batch_complete(&self, _: usize, _: usize, _: usize) {}
    }

    fn t(s: &str) -> Ticker {
        Ticker::new(s).unwrap()
    }

    const BODY: &str = "Date,Close\n2018-01-02,10\n2018-01-03,11\n2018-01-05,12\n";

    #[test]
    fn chunks_accumulate_without_loss_for_any_chunk_size() {
        let endpoint = Endpoint::new("http://mock/");
        let request = FetchRequest {
            endpoint: &endpoint,
            token: "K",
            range: DateRange::unbounded(),
        };
        for chunk in [1, 2, 3, 7, 64, 4096] {
            let transport = ChunkedTransport::new(chunk).serve("JPM", BODY);
            let bytes = fetch(&transport, &request, &t("JPM")).unwrap();
            assert_eq!(bytes, BODY.as_bytes(), "chunk size {chunk}");
        }
    }

    #[test]
    fn non_success_status_is_reported_with_ticker() {
        let endpoint = Endpoint::new("http://mock/");
        let request = FetchRequest {
            endpoint: &endpoint,
            token: "K",
            range: DateRange::unbounded(),
        };
        let transport = ChunkedTransport::new(8);
        let err = fetch(&transport, &request, &t("NOPE")).unwrap_err();
        match err {
            FetchError::Status { ticker, status } => {
                assert_eq!(ticker.as_str(), "NOPE");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn batch_preserves_ticker_order() {
        let endpoint = Endpoint::new("http://mock/");
        let request = FetchRequest {
            endpoint: &endpoint,
            token: "K",
            range: DateRange::unbounded(),
        };
        let transport = ChunkedTransport::new(5)
            .serve("A", "Date,Close\n2018-01-02,1\n")
            .serve("B", "Date,Close\n2018-01-02,2\n")
            .serve("C", "Date,Close\n2018-01-02,3\n");
        let tickers = vec![t("C"), t("A"), t("B")];
        let bodies = fetch_all(&transport, &request, &tickers, 3, &Silent).unwrap();
        let order: Vec<&str> = bodies.iter().map(|b| b.ticker.as_str()).collect();
        assert_eq!(order, ["C", "A", "B"]);
        assert!(String::from_utf8_lossy(&bodies[0].bytes).ends_with(",3\n"));
        assert_eq!(transport.urls.lock().unwrap().len(), 3);
    }

    #[test]
    fn one_failure_fails_the_batch_after_draining() {
        let endpoint = Endpoint::new("http://mock/");
        let request = FetchRequest {
            endpoint: &endpoint,
            token: "K",
            range: DateRange::unbounded(),
        };
        let transport = ChunkedTransport::new(5)
            .serve("A", BODY)
            .serve("C", BODY);
        let tickers = vec![t("A"), t("B"), t("C")];
        for workers in [1, 2] {
            let err = fetch_all(&transport, &request, &tickers, workers, &Silent).unwrap_err();
            assert_eq!(err.ticker().map(Ticker::as_str), Some("B"));
        }
        // Every ticker was requested in both runs.
        assert_eq!(transport.urls.lock().unwrap().len(), 6);
    }

    #[test]
    fn key_is_redacted_for_logs() {
        let s = redact_key("http://x/A.csv?order=asc&api_key=SECRET", "SECRET");
        assert!(!s.contains("SECRET"));
    }
}
