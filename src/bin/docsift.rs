//! CLI binary for docsift.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use docsift::config::DEFAULT_ENDPOINT;
use docsift::{
    analyze, analyze_to_file, inspect, structure, structure_file, AnalysisConfig,
    AnalysisProgressCallback, Document, FileType, PageRange, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner whose prefix follows the pipeline
/// stage, with one log line per finished stage printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Resolving input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Stop the spinner after a failure so the error prints on a clean line.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_analysis_start(&self, file_name: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analyzing {file_name}"))
        ));
    }

    fn on_slice_complete(&self, range: PageRange, source_pages: usize) {
        self.bar.println(format!(
            "  {} Pages {}  {}",
            green("✓"),
            range,
            dim(&format!("of {source_pages}")),
        ));
    }

    fn on_upload_start(&self, bytes: u64) {
        self.bar.set_prefix("Analyzing");
        self.bar
            .set_message(format!("{} sent, waiting for the service", dim(&format!("{bytes} bytes"))));
    }

    fn on_retry(&self, attempt: u32, max_retries: u32, reason: &str) {
        // Keep long upstream error bodies to one terminal line.
        let msg = match reason.char_indices().nth(79) {
            Some((idx, _)) => format!("{}\u{2026}", &reason[..idx]),
            None => reason.to_string(),
        };
        self.bar.println(format!(
            "  {} Retry {}/{}  {}",
            cyan("⚠"),
            attempt,
            max_retries,
            red(&msg),
        ));
    }

    fn on_response(&self, status: u16, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} HTTP {}  {}",
            green("✓"),
            status,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.set_prefix("Structuring");
        self.bar.set_message("");
    }

    fn on_analysis_complete(&self, sections: usize, assets: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} sections, {} assets",
            green("✔"),
            bold(&sections.to_string()),
            bold(&assets.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze the first two pages (JSON to stdout)
  docsift --start-page 1 --end-page 2 report.pdf

  # Save the augmented response to a file
  docsift --start-page 3 --end-page 4 report.pdf -o pages-3-4.json

  # Print the section tree instead of JSON
  docsift --outline --start-page 1 --end-page 2 report.pdf

  # Analyze an image
  docsift --file-type image scan.jpg

  # Restructure markdown you already have (no API call)
  docsift --structure-only --outline analysis.md
  cat analysis.md | docsift --structure-only -

  # Inspect PDF metadata (no API key needed)
  docsift --inspect-only report.pdf

ENVIRONMENT VARIABLES:
  LANDING_AI_API_KEY   API key for the document-analysis service
  DOCSIFT_ENDPOINT     Override the analysis endpoint
  PDFIUM_LIB_PATH      Path to an existing libpdfium for page slicing
  RUST_LOG             Log filter (overrides -v / -q)
"#;

/// Analyze PDF pages and images, and restructure the markdown reply.
#[derive(Parser, Debug)]
#[command(
    name = "docsift",
    version,
    about = "Analyze PDF pages and images and restructure the result into sections",
    long_about = "Send a PDF page range or an image to a document-analysis service and \
restructure the markdown it returns into sections, subsections and assets.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL (`-` reads markdown from stdin with --structure-only).
    input: String,

    /// Kind of document: pdf or image.
    #[arg(long, env = "DOCSIFT_FILE_TYPE", default_value = "pdf")]
    file_type: FileType,

    /// First page to analyze (1-indexed, PDF only).
    #[arg(long, requires = "end_page")]
    start_page: Option<usize>,

    /// Last page to analyze (inclusive, PDF only).
    #[arg(long, requires = "start_page")]
    end_page: Option<usize>,

    /// API key for the analysis service.
    #[arg(long, env = "LANDING_AI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Analysis endpoint URL.
    #[arg(long, env = "DOCSIFT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCSIFT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Retries on 429, 5xx and timeouts.
    #[arg(long, env = "DOCSIFT_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Analysis call timeout in seconds.
    #[arg(long, env = "DOCSIFT_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "DOCSIFT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "DOCSIFT_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the section tree instead of JSON.
    #[arg(long, conflicts_with = "markdown")]
    outline: bool,

    /// Print the markdown returned by the service instead of JSON.
    #[arg(long)]
    markdown: bool,

    /// Treat the input as a markdown file and only restructure it.
    #[arg(long, conflicts_with_all = ["inspect_only", "markdown"])]
    structure_only: bool,

    /// Print PDF metadata only, no analysis.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress spinner.
    #[arg(long, env = "DOCSIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCSIFT_QUIET")]
    quiet: bool,
}

/// What goes to stdout (or `--output`).
enum View {
    Json,
    Outline,
    Markdown,
}

impl Cli {
    fn view(&self) -> View {
        if self.outline {
            View::Outline
        } else if self.markdown {
            View::Markdown
        } else {
            View::Json
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; verbose mode wants everything anyway.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.structure_only && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Structure-only mode ──────────────────────────────────────────────
    if cli.structure_only {
        let doc = if cli.input == "-" {
            let mut markdown = String::new();
            io::stdin()
                .read_to_string(&mut markdown)
                .context("Failed to read markdown from stdin")?;
            structure(&markdown)
        } else {
            structure_file(&cli.input)
                .await
                .context("Failed to read markdown")?
        };
        let rendered = match cli.view() {
            View::Outline => doc.outline(),
            _ => serde_json::to_string_pretty(&doc).context("Failed to serialise document")?,
        };
        emit(&rendered, cli.output.as_deref()).await?;
        if !cli.quiet {
            summary(&doc);
        }
        return Ok(());
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        println!("File:         {}", cli.input);
        if let Some(ref t) = meta.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = meta.author {
            println!("Author:       {}", a);
        }
        println!("Pages:        {}", meta.page_count);
        println!("PDF Version:  {}", meta.pdf_version);
        if let Some(ref p) = meta.producer {
            println!("Producer:     {}", p);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as Arc<dyn AnalysisProgressCallback>),
    )?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let result = run(&cli, &config).await;
    if result.is_err() {
        if let Some(cb) = progress {
            cb.abandon();
        }
    }
    result
}

async fn run(cli: &Cli, config: &AnalysisConfig) -> Result<()> {
    if let (Some(output_path), View::Json) = (cli.output.as_ref(), cli.view()) {
        let stats = analyze_to_file(&cli.input, output_path, config)
            .await
            .context("Analysis failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} sections  {} assets  {}ms  →  {}",
                green("✔"),
                stats.section_count,
                stats.asset_count,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            if stats.retries > 0 {
                eprintln!("   {} retries", dim(&stats.retries.to_string()));
            }
        }
        return Ok(());
    }

    let output = analyze(&cli.input, config)
        .await
        .context("Analysis failed")?;

    let rendered = match cli.view() {
        View::Json => serde_json::to_string_pretty(&output.response)
            .context("Failed to serialise output")?,
        View::Outline => output.document.outline(),
        View::Markdown => output.markdown.clone(),
    };
    emit(&rendered, cli.output.as_deref()).await?;

    if !cli.quiet {
        eprintln!(
            "   {} bytes uploaded  —  {}ms total",
            dim(&output.stats.uploaded_bytes.to_string()),
            output.stats.total_duration_ms,
        );
    }
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .endpoint(&cli.endpoint)
        .file_type(cli.file_type)
        .max_retries(cli.max_retries)
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout);

    if let (Some(start), Some(end)) = (cli.start_page, cli.end_page) {
        builder = builder.pages(PageRange::new(start, end).context("Invalid page range")?);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write to `path`, or to stdout with a trailing newline.
async fn emit(text: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => tokio::fs::write(p, text)
            .await
            .with_context(|| format!("Failed to write {}", p.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(())
        }
    }
}

fn summary(doc: &Document) {
    eprintln!(
        "{} {} sections, {} subsections, {} assets  {}",
        if doc.is_empty() { cyan("⚠") } else { green("✔") },
        doc.sections.len(),
        doc.subsection_count(),
        doc.asset_count(),
        dim(&format!("({} lines)", doc.raw_content.len())),
    );
}
