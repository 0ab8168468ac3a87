//! Result types returned by [`crate::analyze`].

use crate::config::{FileType, PageRange};
use crate::document::Document;
use serde::{Deserialize, Serialize};

/// Everything produced by one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// The service's JSON body, with `data.sections` and `data.raw_content`
    /// filled in from [`Self::document`].
    pub response: serde_json::Value,

    /// `data.markdown` as returned by the service.
    pub markdown: String,

    /// The markdown restructured into sections.
    pub document: Document,

    pub metadata: AnalysisMetadata,
    pub stats: AnalysisStats,
}

/// Where the analysed content came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Base name of the input file (not of the sliced temp file).
    pub file_name: String,
    pub file_type: FileType,
    /// Absolute directory of the input file, or the URL for downloads.
    pub folder_path: String,
    /// Pages sent, when a range was applied.
    pub page_range: Option<PageRange>,
    /// Number of pages sent. None when unknown (images).
    pub total_pages: Option<usize>,
    /// The service's `timestamp` field, if it sent one.
    pub analysis_timestamp: Option<String>,
}

/// Timing and size counters for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub uploaded_bytes: u64,
    pub retries: u32,
    pub slice_duration_ms: u64,
    pub api_duration_ms: u64,
    pub total_duration_ms: u64,
    pub section_count: usize,
    pub subsection_count: usize,
    pub asset_count: usize,
}
