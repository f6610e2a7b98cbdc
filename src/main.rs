//! CLI entry point for the GTFS-RT poller.
//!
//! Polls a single GTFS Realtime feed on a fixed interval, projects the first
//! trip update or vehicle position into a JSON document, and delivers it to
//! the configured sink.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gtfs_rt_poller::{
    config::Config,
    fetch::{BasicClient, WithHeader, fetch_bytes},
    output::{EventSink, sink_for},
    parser::parse_feed,
    poller::Poller,
    projector::select_and_project,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_poller")]
#[command(about = "Poll a GTFS-RT feed and forward it as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the configured feed on its interval and deliver each document
    Run {
        /// Stop after this many polls (0 = run forever)
        #[arg(short = 'n', long, default_value_t = 0)]
        max_polls: usize,
    },
    /// Poll the configured feed once and deliver the document
    Once,
    /// Decode a GTFS-RT file or URL and print the projected document
    Decode {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_poller.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_poller.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { max_polls } => {
            let config = Config::from_env()?;
            run(&config, max_polls).await?;
        }
        Commands::Once => {
            let config = Config::from_env()?;
            let sink = sink_for(&config.sink)?;
            let mut poller = Poller::from_config(&config)?;

            let document = poller.poll_once().await?;
            sink.deliver(&document).await?;
        }
        Commands::Decode { source } => {
            let bytes = load_source(&source).await?;
            let feed = parse_feed(&bytes)?;
            let document = select_and_project(&feed)?;

            println!("{}", document.to_pretty_json()?);
        }
    }

    Ok(())
}

/// Polls on the configured interval. A failed cycle is logged and skipped;
/// the next tick starts fresh.
#[tracing::instrument(skip(config), fields(feed_url = %config.feed_url, interval_secs = config.poll_interval.as_secs()))]
async fn run(config: &Config, max_polls: usize) -> Result<()> {
    let sink = sink_for(&config.sink)?;
    let mut poller = Poller::from_config(config)?;

    if max_polls == 0 {
        info!("Polling until interrupted. Press Ctrl+C to stop.");
    } else {
        info!(max_polls, "Starting bounded polling");
    }

    let mut poll_count = 0;

    loop {
        if max_polls > 0 && poll_count >= max_polls {
            break;
        }
        poll_count += 1;

        // failures were already logged by the poller
        if let Ok(document) = poller.poll_once().await {
            deliver(sink.as_ref(), &document).await;
        }

        if max_polls == 0 || poll_count < max_polls {
            tokio::time::sleep(config.poll_interval).await;
        }
    }

    info!(poll_count, "Finished polling");
    Ok(())
}

async fn deliver(sink: &dyn EventSink, document: &str) {
    if let Err(e) = sink.deliver(document).await {
        error!(error = %e, "Document delivery failed");
    } else {
        info!("Document delivered");
    }
}

/// Loads feed data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip_all, fields(source = %source))]
async fn load_source(source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http") {
        let client = WithHeader::browser(BasicClient::new());
        fetch_bytes(&client, source).await?.to_vec()
    } else {
        std::fs::read(source)?
    };
    Ok(bytes)
}
