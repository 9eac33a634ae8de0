//! HTTP transport capability.
//!
//! The transport is an owned value handed to every fetch; there is no global
//! client. Bodies are delivered chunk by chunk to a sink so the caller decides
//! where the bytes accumulate.

use super::error::FetchError;
use std::io::{ErrorKind, Read};
use std::time::Duration;

/// Read size used when draining a response body.
const CHUNK_SIZE: usize = 16 * 1024;

/// Why a GET did not produce a complete body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// No response at all (DNS, connect, TLS, timeout).
    Connect(String),
    /// Response arrived with a non-2xx status.
    Status(u16),
    /// Body was cut off mid-stream.
    Read(String),
}

/// Something that can GET a URL and stream the body out.
///
/// `sink` is called once per received chunk, in arrival order. Implementations
/// must not buffer-and-reorder; the number and size of chunks is arbitrary.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), TransportFailure>;
}

/// Blocking reqwest client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build a client. `timeout` of `None` keeps reqwest's default.
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, sink: &mut dyn FnMut(&[u8])) -> Result<(), TransportFailure> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportFailure::Connect(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportFailure::Status(status.as_u16()));
        }

        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            match resp.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => sink(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportFailure::Read(e.to_string())),
            }
        }
    }
}
