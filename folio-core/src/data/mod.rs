//! Market-data ingestion: request building, fetching, CSV scanning,
//! alignment and on-disk storage.

pub mod align;
pub mod demux;
pub mod endpoint;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod header;
pub mod manifest;
pub mod rows;
pub mod scan;
pub mod store;
pub mod transport;

pub use align::{assemble, AlignOptions, AlignPolicy, AlignedMatrix, Assembly};
pub use endpoint::{build_filename, build_url, ticker_from_filename, Endpoint, DEFAULT_BASE_URL};
pub use error::{AlignmentError, FetchError, IngestError, StoreError};
pub use extract::{extract_column, read_series};
pub use fetch::{fetch, fetch_all, FetchProgress, FetchRequest, FetchedBody, TracingProgress};
pub use header::{index_of, FieldIndex};
pub use manifest::Manifest;
pub use rows::RowStream;
pub use scan::{seek_by, seek_to, SeekOutcome};
pub use store::{ensure_root, open_inputs, open_series_file, write_series_file};
pub use transport::{HttpTransport, Transport, TransportFailure};
