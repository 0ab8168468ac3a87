//! # docsift
//!
//! Send PDF pages or images to a document-analysis service and turn the
//! markdown it returns into a tree of sections, subsections and assets.
//!
//! ## Why this crate?
//!
//! The analysis service answers with one flat markdown string. Downstream
//! consumers want to ask "what does section *Specs* say" or "list every
//! figure", which means re-reading that string with the service's own
//! conventions: `# ` opens a section, `## ` a subsection, `**Asset Type:**`,
//! `**Description:**` and `**Tag:**` lines describe an asset, and
//! `Original:` / `Analyzed:` lines hold the two text bodies of a subsection.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Slice      copy the requested page range via pdfium (spawn_blocking)
//!  ├─ 3. Upload     multipart POST with retry/backoff
//!  ├─ 4. Structure  line-by-line state machine over data.markdown
//!  └─ 5. Output     response + Document tree + metadata + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docsift::{analyze, AnalysisConfig, PageRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from LANDING_AI_API_KEY
//!     let config = AnalysisConfig::builder()
//!         .pages(PageRange::new(1, 2)?)
//!         .build()?;
//!     let output = analyze("report.pdf", &config).await?;
//!     println!("{}", output.document.outline());
//!     Ok(())
//! }
//! ```
//!
//! The structurer is usable on its own, without any network access:
//!
//! ```rust
//! let doc = docsift::structure("# Intro\n## Goals\nOriginal: x\nAnalyzed: y");
//! assert_eq!(doc.sections[0].subsections[0].analyzed_text, "y");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `docsift` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Enables the `docsift-web` binary and [`server`] module (axum + tower-http) |
//!
//! Disable both when using only the library:
//! ```toml
//! docsift = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod structure;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_from_bytes, analyze_sync, analyze_to_file, inspect, structure_file};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, FileType, PageRange};
pub use document::{Asset, Document, Section, Subsection};
pub use error::DocsiftError;
pub use output::{AnalysisMetadata, AnalysisOutput, AnalysisStats};
pub use pipeline::slice::PdfInfo;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use structure::{structure, LineKind, Structurer};
