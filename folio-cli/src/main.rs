//! Folio CLI: fetch daily prices and align them into a matrix.
//!
//! Commands:
//! - `fetch`: download per-ticker CSV bodies into a directory, or as one
//!   demultiplexed stream on stdout
//! - `align`: read a manifest (or a demultiplexed stream) from stdin and
//!   write the aligned date-by-ticker matrix to stdout
//!
//! Diagnostics go to stderr; stdout carries only data.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use folio_core::config::FolioConfig;
use folio_core::data::{
    assemble, demux, ensure_root, fetch_all, open_inputs, write_series_file, AlignOptions,
    AlignPolicy, AlignedMatrix, Assembly, FetchRequest, HttpTransport, Manifest, RowStream,
    TracingProgress,
};
use folio_core::domain::DateRange;
use folio_core::export::{write_parquet, CsvSink, JsonSink, MatrixSink};
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio", about = "Folio: daily price ingestion and alignment")]
struct Cli {
    /// Log at debug level. RUST_LOG overrides.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily prices for one or more tickers.
    Fetch(FetchArgs),
    /// Align stored or streamed series into one matrix.
    Align(AlignArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Tickers to fetch (e.g., JPM BAC C).
    tickers: Vec<String>,

    /// File holding the API key.
    #[arg(short = 'k', long)]
    key_file: Option<PathBuf>,

    /// Begin date (YYYY-MM-DD).
    #[arg(short, long)]
    begin: Option<String>,

    /// End date (YYYY-MM-DD).
    #[arg(short, long)]
    end: Option<String>,

    /// Output directory. Without it every body goes to stdout.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Concurrent fetches.
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Dataset endpoint.
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Args)]
struct AlignArgs {
    /// Read the manifest from this file instead of stdin.
    #[arg(long, conflicts_with = "demux")]
    manifest: Option<PathBuf>,

    /// Stdin is a demultiplexed stream from `folio fetch` without `-o`.
    #[arg(long, default_value_t = false)]
    demux: bool,

    /// Begin date for `--demux` input.
    #[arg(short, long, requires = "demux")]
    begin: Option<String>,

    /// End date for `--demux` input.
    #[arg(short, long, requires = "demux")]
    end: Option<String>,

    /// Column holding the price.
    #[arg(long)]
    price_field: Option<String>,

    /// Column holding the trading date.
    #[arg(long)]
    date_field: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Also write the matrix as Parquet.
    #[arg(long)]
    parquet: Option<PathBuf>,

    /// Drop tickers that fail to scan or parse instead of aborting.
    #[arg(long, default_value_t = false)]
    isolate: bool,

    /// TOML config file for field names.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Align(args) => run_align(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<FolioConfig> {
    match path {
        Some(path) => FolioConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(FolioConfig::default()),
    }
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if !args.tickers.is_empty() {
        config.tickers = args.tickers;
    }
    config.api_key_file = args.key_file.or(config.api_key_file);
    config.begin = args.begin.or(config.begin);
    config.end = args.end.or(config.end);
    config.output_dir = args.output_dir.or(config.output_dir);
    config.workers = args.workers.or(config.workers);
    config.base_url = args.base_url.or(config.base_url);
    config.timeout_secs = args.timeout_secs.or(config.timeout_secs);

    let token = config.api_key()?;
    let tickers = config.tickers()?;
    let range = config.range()?;
    let workers = config.workers()?;
    let endpoint = config.endpoint();

    if let Some(dir) = &config.output_dir {
        ensure_root(dir)?;
    }

    let transport = HttpTransport::new(config.timeout_secs.map(Duration::from_secs))?;
    let request = FetchRequest {
        endpoint: &endpoint,
        token: &token,
        range,
    };
    let bodies = fetch_all(&transport, &request, &tickers, workers, &TracingProgress)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match &config.output_dir {
        Some(dir) => {
            let mut paths = Vec::with_capacity(bodies.len());
            for body in &bodies {
                paths.push(write_series_file(dir, &body.ticker, &range, &body.bytes)?);
            }
            info!(files = paths.len(), dir = %dir.display(), "series files written");
            if range.is_bounded() {
                Manifest::new(&range, paths)?.write(&mut out)?;
            }
        }
        None => {
            for body in &bodies {
                demux::write_section(&mut out, &body.ticker, &body.bytes)?;
            }
        }
    }

    out.flush().context("failed to flush stdout")?;
    Ok(())
}

fn run_align(args: AlignArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;
    let date_field = args
        .date_field
        .unwrap_or_else(|| config.date_field().to_string());
    let price_field = args
        .price_field
        .unwrap_or_else(|| config.price_field().to_string());
    let policy = if args.isolate {
        AlignPolicy::Isolate
    } else {
        AlignPolicy::AllOrNothing
    };

    let input = match &args.manifest {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let assembly = if args.demux {
        let range = DateRange::parse(args.begin.as_deref(), args.end.as_deref())?;
        let options = AlignOptions::new(range)
            .with_date_field(date_field)
            .with_price_field(price_field)
            .with_policy(policy);
        let sections = demux::read_sections(input.as_bytes())?;
        let inputs = sections
            .iter()
            .map(|(ticker, body)| (ticker.clone(), RowStream::from_bytes(body)))
            .collect();
        assemble(inputs, &options)?
    } else {
        let manifest = Manifest::parse(&input)?;
        let options = AlignOptions::new(manifest.range())
            .with_date_field(date_field)
            .with_price_field(price_field)
            .with_policy(policy);
        assemble(open_inputs(&manifest.paths)?, &options)?
    };

    report(&assembly);
    let matrix = &assembly.matrix;

    if let Some(path) = &args.parquet {
        write_parquet(matrix, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    write_matrix(matrix, args.format)
}

fn report(assembly: &Assembly) {
    for failure in &assembly.failures {
        warn!("excluded: {failure}");
    }
    let matrix = &assembly.matrix;
    info!(
        start = %assembly.common_start,
        rows = matrix.len(),
        tickers = matrix.tickers().len(),
        fingerprint = %matrix.fingerprint(),
        "aligned"
    );
}

fn write_matrix(matrix: &AlignedMatrix, format: OutputFormat) -> Result<()> {
    let sink: Box<dyn MatrixSink> = match format {
        OutputFormat::Csv => Box::new(CsvSink),
        OutputFormat::Json => Box::new(JsonSink),
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    sink.write_matrix(matrix, &mut out)?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}
