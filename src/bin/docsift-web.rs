//! Web front-end binary for docsift.
//!
//! Serves one configured PDF: pick a page range in the browser and get the
//! structured analysis of those pages back.

use anyhow::{Context, Result};
use clap::builder::TypedValueParser;
use clap::Parser;
use docsift::config::DEFAULT_ENDPOINT;
use docsift::server::{start_server, ServerState, DEFAULT_MAX_PAGES};
use docsift::AnalysisConfig;
use std::io;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Serve page-range analysis of a PDF over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "docsift-web",
    version,
    about = "Serve page-range analysis of a PDF over HTTP",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "DOCSIFT_ADDR", default_value = "127.0.0.1:5000")]
    addr: String,

    /// The PDF every request analyses.
    #[arg(long, env = "DOCSIFT_PDF")]
    pdf: PathBuf,

    /// Largest page range a single request may ask for.
    #[arg(long, env = "DOCSIFT_MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES,
          value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    max_pages: usize,

    /// API key for the analysis service.
    #[arg(long, env = "LANDING_AI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Analysis endpoint URL.
    #[arg(long, env = "DOCSIFT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCSIFT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Analysis call timeout in seconds.
    #[arg(long, env = "DOCSIFT_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSIFT_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else {
        "info,tower_http=debug"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut builder = AnalysisConfig::builder()
        .endpoint(&cli.endpoint)
        .request_timeout_secs(cli.timeout);
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    let config = builder.build().context("Invalid configuration")?;

    // Both are reported again per request.
    if config.resolve_api_key().is_err() {
        warn!("No API key configured; /analyze will fail until LANDING_AI_API_KEY is set");
    }
    if !cli.pdf.is_file() {
        warn!("PDF not found at {}; /analyze will answer 404", cli.pdf.display());
    }

    let state = ServerState::new(config, &cli.pdf).with_max_pages(cli.max_pages);
    start_server(&cli.addr, state)
        .await
        .with_context(|| format!("Server on {} stopped", cli.addr))
}
