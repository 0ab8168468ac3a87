//! Analysis entry points: resolve, slice, upload, structure.
//!
//! [`analyze`] is the one call the binaries make. The helpers around it cover
//! the other ways a caller may hold a document: raw bytes, a sync context,
//! an output file, or a markdown file that only needs restructuring.

use crate::config::{AnalysisConfig, FileType};
use crate::document::Document;
use crate::error::DocsiftError;
use crate::output::{AnalysisMetadata, AnalysisOutput, AnalysisStats};
use crate::pipeline::slice::{self, PdfInfo, SlicedPdf};
use crate::pipeline::{input, upload};
use crate::structure::structure;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Analyse a PDF or image file (local path or URL).
///
/// # Errors
/// Returns `Err(DocsiftError)` when:
/// - no API key is configured
/// - the file is missing, unreadable, or not of the configured type
/// - the page range does not fit the PDF or exceeds `max_pages`
/// - the service fails after all retries, or answers with malformed JSON
pub async fn analyze(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, DocsiftError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting analysis: {}", input_str);

    // ── Step 1: Credentials and page budget ──────────────────────────────
    let api_key = config.resolve_api_key()?;
    config.check_page_budget()?;

    // ── Step 2: Resolve input ────────────────────────────────────────────
    let resolved =
        input::resolve_input(input_str, config.file_type, config.download_timeout_secs).await?;
    let file_name = resolved.file_name();
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(&file_name);
    }

    // ── Step 3: Slice the requested pages ────────────────────────────────
    let slice_start = Instant::now();
    let mut sliced: Option<SlicedPdf> = None;
    let mut total_pages: Option<usize> = None;

    match (config.file_type, config.pages) {
        (FileType::Pdf, Some(range)) => {
            info!("Extracting pages {} from PDF...", range);
            let s = slice::slice_pages(resolved.path(), range, config.password.as_deref()).await?;
            info!("Created temporary PDF with selected pages: {}", s.path().display());
            if let Some(ref cb) = config.progress_callback {
                cb.on_slice_complete(range, s.source_pages);
            }
            total_pages = Some(range.len());
            sliced = Some(s);
        }
        (FileType::Pdf, None) => {
            match slice::pdf_info(resolved.path(), config.password.as_deref()).await {
                Ok(info) => total_pages = Some(info.page_count),
                Err(e) => debug!("Page count unavailable, uploading whole file: {}", e),
            }
        }
        (FileType::Image, Some(range)) => {
            warn!("Ignoring page range {} for an image input", range);
        }
        (FileType::Image, None) => {}
    }
    let slice_duration_ms = slice_start.elapsed().as_millis() as u64;

    // ── Step 4: Upload ───────────────────────────────────────────────────
    let upload_path = sliced
        .as_ref()
        .map(|s| s.path())
        .unwrap_or_else(|| resolved.path());
    let reply = upload::post_document(upload_path, &file_name, &api_key, config).await?;
    drop(sliced);

    // ── Step 5: Structure and merge ──────────────────────────────────────
    let mut response = reply.body;
    let markdown = upload::extract_markdown(&response)?;
    let document = structure(&markdown);
    upload::merge_document(&mut response, &document)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(document.sections.len(), document.asset_count());
    }

    let metadata = AnalysisMetadata {
        file_name,
        file_type: config.file_type,
        folder_path: resolved.origin(),
        page_range: config.pages.filter(|_| config.file_type == FileType::Pdf),
        total_pages,
        analysis_timestamp: upload::response_timestamp(&response),
    };

    let stats = AnalysisStats {
        uploaded_bytes: reply.uploaded_bytes,
        retries: reply.retries,
        slice_duration_ms,
        api_duration_ms: reply.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        section_count: document.sections.len(),
        subsection_count: document.subsection_count(),
        asset_count: document.asset_count(),
    };

    info!(
        "Analysis complete: {} sections, {} assets, {}ms total",
        stats.section_count, stats.asset_count, stats.total_duration_ms
    );

    Ok(AnalysisOutput {
        response,
        markdown,
        document,
        metadata,
        stats,
    })
}

/// Analyse and write the output as pretty JSON to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisStats, DocsiftError> {
    let output = analyze(input_str, config).await?;
    let json = serde_json::to_string_pretty(&output.response)
        .map_err(|e| DocsiftError::Internal(format!("serialise output: {e}")))?;
    write_json_atomically(output_path.as_ref(), json).await?;
    Ok(output.stats)
}

/// Write `json` next to `path` and rename it into place. The temp file is
/// removed if the rename fails.
async fn write_json_atomically(path: &Path, json: String) -> Result<(), DocsiftError> {
    let write_err = |e: std::io::Error| DocsiftError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }
    Ok(())
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, DocsiftError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocsiftError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(input_str, config))
}

/// Analyse a document held in memory.
///
/// The bytes are written to a managed temp file that is deleted on return.
/// The service sees the temp file's name, which carries the extension of the
/// configured file type.
pub async fn analyze_from_bytes(
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, DocsiftError> {
    let suffix = match config.file_type {
        FileType::Pdf => ".pdf",
        FileType::Image => ".jpg",
    };
    let mut tmp = tempfile::Builder::new()
        .prefix("docsift-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| DocsiftError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| DocsiftError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `analyze` returns
    analyze(&path, config).await
}

/// Read PDF facts without contacting the analysis service.
///
/// Does not require an API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    password: Option<&str>,
) -> Result<PdfInfo, DocsiftError> {
    let resolved = input::resolve_input(input_str.as_ref(), FileType::Pdf, 120).await?;
    slice::pdf_info(resolved.path(), password).await
}

/// Restructure a markdown file already on disk. No network access.
pub async fn structure_file(path: impl AsRef<Path>) -> Result<Document, DocsiftError> {
    let path = path.as_ref();
    let markdown = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DocsiftError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => DocsiftError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
    Ok(structure(&markdown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageRange;

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        // A non-empty directory at the target path makes the rename fail.
        let target = dir.path().join("out.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        let err = write_json_atomically(&target, "{}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DocsiftError::OutputWriteFailed { .. }));
        assert!(!dir.path().join("out.json.tmp").exists());
        assert!(target.join("keep").exists());
    }

    #[tokio::test]
    async fn atomic_write_leaves_only_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("nested").join("out.json");

        write_json_atomically(&target, "{\"ok\":true}".to_string())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{\"ok\":true}");
        assert!(!target.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_io() {
        std::env::remove_var(crate::config::API_KEY_ENV);
        let config = AnalysisConfig::default();
        let err = analyze("/does/not/matter.pdf", &config).await.unwrap_err();
        assert!(matches!(err, DocsiftError::MissingApiKey));
    }

    #[tokio::test]
    async fn page_budget_is_checked_before_io() {
        let mut config = AnalysisConfig::builder().api_key("k").build().unwrap();
        config.pages = Some(PageRange::new(1, 5).unwrap());
        config.max_pages = Some(2);
        let err = analyze("/does/not/matter.pdf", &config).await.unwrap_err();
        assert!(matches!(err, DocsiftError::TooManyPages { requested: 5, max: 2 }));
    }

    #[tokio::test]
    async fn structure_file_reads_markdown() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "# One\n## Two\ntext\n").unwrap();
        let doc = structure_file(tmp.path()).await.unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].subsections[0].analyzed_text, "text");
        assert_eq!(doc.raw_content.len(), 4);
    }

    #[tokio::test]
    async fn structure_file_missing() {
        let err = structure_file("/no/such/file.md").await.unwrap_err();
        assert!(matches!(err, DocsiftError::FileNotFound { .. }));
    }
}
