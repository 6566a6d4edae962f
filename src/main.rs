use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use placeviz::parser::parse_filters;
use placeviz::{Dataset, Explorer, ExplorerConfig, ExplorerError, UpdateRequest};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "placeviz")]
#[command(about = "Aggregate student placement records into chart-ready series", long_about = None)]
struct Args {
    /// Dataset to query: CSV, or a JSON array of objects when the extension is .json
    #[arg(long, env = "PLACEVIZ_DATA", default_value = "placementdata.csv")]
    data: PathBuf,

    /// JSON file overriding the built-in option lists and step sizes
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer an update request read as JSON from a file or stdin
    Update {
        /// Request file (defaults to stdin)
        #[arg(long)]
        request: Option<PathBuf>,
    },
    /// Build an update request from flags (e.g. --x CGPA --agg avg --filter 'Internships=0,1')
    Query {
        #[arg(long)]
        x: String,
        /// Defaults to x, which picks the first other y-axis option
        #[arg(long)]
        y: Option<String>,
        #[arg(long, default_value = "avg")]
        agg: String,
        #[arg(long, default_value = "None")]
        facet: String,
        /// COL=LO..HI or COL=a,b,c (COL= selects nothing); repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    /// List filter domains and axis, aggregation and facet options
    Options,
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        let caller_error = e
            .downcast_ref::<ExplorerError>()
            .map_or(false, |err| err.is_caller_error());
        std::process::exit(if caller_error { 2 } else { 1 });
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ExplorerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExplorerConfig::default(),
    };

    let dataset = Dataset::load(&args.data)
        .with_context(|| format!("Failed to read dataset {}", args.data.display()))?;
    tracing::info!(rows = dataset.len(), path = %args.data.display(), "loaded dataset");

    let explorer = Explorer::new(dataset, config);

    match args.command {
        Command::Update { request } => {
            let body = match request {
                Some(path) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read request {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read request from stdin")?;
                    buf
                }
            };
            let request = UpdateRequest::from_json_str(&body)?;
            let response = explorer.update(&request)?;
            write_json(&response, args.pretty)
        }
        Command::Query { x, y, agg, facet, filters } => {
            let request = UpdateRequest {
                filters: parse_filters(&filters)?,
                y: y.unwrap_or_else(|| x.clone()),
                x,
                agg,
                facet,
            };
            let response = explorer.update(&request)?;
            write_json(&response, args.pretty)
        }
        Command::Options => {
            let options = explorer.options()?;
            write_json(&options, args.pretty)
        }
    }
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(json.as_bytes())
        .context("Failed to write JSON to stdout")?;
    handle.write_all(b"\n")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}
