//! PDF page slicing: copy a page range into a temporary PDF via pdfium.
//!
//! The analysis service bills and times out per page, so only the requested
//! range is uploaded. pdfium is a blocking C library with process-global
//! state; all work runs inside `spawn_blocking` and the library is bound once
//! per process.
//!
//! The slice is written to a [`NamedTempFile`] owned by [`SlicedPdf`]; the
//! file is deleted when that value drops, whether the upload succeeded or not.

use crate::config::PageRange;
use crate::error::DocsiftError;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Environment variable pointing at an existing pdfium shared library.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// A temporary PDF holding only the requested pages.
pub struct SlicedPdf {
    file: NamedTempFile,
    /// The pages that were copied.
    pub range: PageRange,
    /// Page count of the source document.
    pub source_pages: usize,
}

impl SlicedPdf {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Basic facts about a PDF, read without slicing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInfo {
    pub page_count: usize,
    pub pdf_version: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
}

/// Bind pdfium on first use: `PDFIUM_LIB_PATH`, then the working directory,
/// then the system library.
fn pdfium() -> Result<&'static Pdfium, DocsiftError> {
    PDFIUM.get_or_try_init(|| {
        let bindings = match std::env::var(PDFIUM_LIB_ENV) {
            Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
            _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| DocsiftError::PdfiumBindingFailed(format!("{e:?}")))?;
        info!("pdfium bound");
        Ok(Pdfium::new(bindings))
    })
}

fn load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> DocsiftError {
    let detail = format!("{e:?}");
    if detail.contains("Password") || detail.contains("password") {
        if password.is_some() {
            DocsiftError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            DocsiftError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        DocsiftError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

/// Copy `range` out of the PDF at `pdf_path` into a new temporary PDF.
///
/// Fails with [`DocsiftError::PageOutOfRange`] when the range ends past the
/// last page.
pub async fn slice_pages(
    pdf_path: &Path,
    range: PageRange,
    password: Option<&str>,
) -> Result<SlicedPdf, DocsiftError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || slice_pages_blocking(&path, range, pwd.as_deref()))
        .await
        .map_err(|e| DocsiftError::Internal(format!("Slice task panicked: {}", e)))?
}

fn slice_pages_blocking(
    pdf_path: &Path,
    range: PageRange,
    password: Option<&str>,
) -> Result<SlicedPdf, DocsiftError> {
    let pdfium = pdfium()?;

    let source = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password, e))?;

    let source_pages = source.pages().len() as usize;
    range.validate(source_pages)?;

    let slice_err = |detail: String| DocsiftError::SliceFailed {
        range: range.to_string(),
        detail,
    };

    let (first, last) = range.to_indices();
    let first = PdfPageIndex::try_from(first).map_err(|e| slice_err(e.to_string()))?;
    let last = PdfPageIndex::try_from(last).map_err(|e| slice_err(e.to_string()))?;

    let mut sliced = pdfium
        .create_new_pdf()
        .map_err(|e| slice_err(format!("{e:?}")))?;
    sliced
        .pages_mut()
        .copy_page_range_from_document(&source, first..=last, 0)
        .map_err(|e| slice_err(format!("{e:?}")))?;

    let file = tempfile::Builder::new()
        .prefix("docsift-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| DocsiftError::Internal(format!("tempfile: {e}")))?;

    sliced
        .save_to_file(file.path())
        .map_err(|e| slice_err(format!("{e:?}")))?;

    debug!(
        "Sliced pages {} of {} from {} into {}",
        range,
        source_pages,
        pdf_path.display(),
        file.path().display()
    );

    Ok(SlicedPdf {
        file,
        range,
        source_pages,
    })
}

/// Read page count and document metadata without slicing.
pub async fn pdf_info(pdf_path: &Path, password: Option<&str>) -> Result<PdfInfo, DocsiftError> {
    let path: PathBuf = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || pdf_info_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| DocsiftError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn pdf_info_blocking(pdf_path: &Path, password: Option<&str>) -> Result<PdfInfo, DocsiftError> {
    let pdfium = pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password, e))?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(PdfInfo {
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
    })
}
