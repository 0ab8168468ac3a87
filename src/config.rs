//! Configuration types for document analysis.
//!
//! Every knob of an [`analyze`](crate::analyze::analyze) call lives in
//! [`AnalysisConfig`], built via its [`AnalysisConfigBuilder`]. The binaries
//! map their flags and environment variables onto the builder; library users
//! set only what they care about and rely on the defaults for the rest.

use crate::error::DocsiftError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default endpoint of the agentic document-analysis service.
pub const DEFAULT_ENDPOINT: &str = "https://api.va.landing.ai/v1/tools/agentic-document-analysis";

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "LANDING_AI_API_KEY";

/// Configuration for one analysis request.
///
/// # Example
/// ```rust
/// use docsift::{AnalysisConfig, FileType, PageRange};
///
/// let config = AnalysisConfig::builder()
///     .file_type(FileType::Pdf)
///     .pages(PageRange::new(3, 4).unwrap())
///     .max_pages(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.pages.unwrap().len(), 2);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// API key sent as `Authorization: Basic <key>`.
    /// If None, read from `LANDING_AI_API_KEY` at call time.
    pub api_key: Option<String>,

    /// Analysis endpoint. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Kind of document being uploaded. Default: [`FileType::Pdf`].
    pub file_type: FileType,

    /// Pages to cut out of a PDF before upload. None uploads the whole file.
    pub pages: Option<PageRange>,

    /// Upper bound on `pages.len()`. None means unlimited.
    ///
    /// The analysis service bills and times out per page; the web front-end
    /// caps requests at 2 pages.
    pub max_pages: Option<usize>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Timeout of a single upload attempt in seconds. Default: 300.
    ///
    /// Agentic analysis of even two dense pages routinely takes over a minute.
    pub request_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Retries after a 429, a 5xx, a timeout or a dropped connection. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 1000.
    pub retry_backoff_ms: u64,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            file_type: FileType::default(),
            pages: None,
            max_pages: None,
            password: None,
            request_timeout_secs: 300,
            download_timeout_secs: 120,
            max_retries: 2,
            retry_backoff_ms: 1000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("file_type", &self.file_type)
            .field("pages", &self.pages)
            .field("max_pages", &self.max_pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured key, else the `LANDING_AI_API_KEY` environment variable.
    pub fn resolve_api_key(&self) -> Result<String, DocsiftError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(DocsiftError::MissingApiKey),
        }
    }

    /// Check `pages` against `max_pages`.
    pub fn check_page_budget(&self) -> Result<(), DocsiftError> {
        if let (Some(range), Some(max)) = (self.pages, self.max_pages) {
            if range.len() > max {
                return Err(DocsiftError::TooManyPages {
                    requested: range.len(),
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn file_type(mut self, file_type: FileType) -> Self {
        self.config.file_type = file_type;
        self
    }

    pub fn pages(mut self, range: PageRange) -> Self {
        self.config.pages = Some(range);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, DocsiftError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(DocsiftError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.max_pages == Some(0) {
            return Err(DocsiftError::InvalidConfig(
                "max_pages must be ≥ 1".into(),
            ));
        }
        c.check_page_budget()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Kind of document sent to the analysis service.
///
/// The service expects the file under a multipart field named after its
/// kind, so the type decides both the field name and the declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Pdf,
    Image,
}

impl FileType {
    /// Multipart form field the file is attached under.
    pub fn form_field(self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Image => "image",
        }
    }

    /// MIME type declared on the multipart part.
    pub fn mime_type(self) -> &'static str {
        match self {
            FileType::Pdf => "application/pdf",
            FileType::Image => "image/jpeg",
        }
    }

    /// Human label used in metadata ("PDF", "Image").
    pub fn label(self) -> &'static str {
        match self {
            FileType::Pdf => "PDF",
            FileType::Image => "Image",
        }
    }
}

impl FromStr for FileType {
    type Err = DocsiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(FileType::Pdf),
            "image" => Ok(FileType::Image),
            other => Err(DocsiftError::InvalidConfig(format!(
                "file type must be 'pdf' or 'image', got '{other}'"
            ))),
        }
    }
}

/// An inclusive, 1-indexed page range such as `3-4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageRange")]
pub struct PageRange {
    start: usize,
    end: usize,
}

/// Unchecked wire form of [`PageRange`]; deserialised values go through
/// [`PageRange::new`].
#[derive(Deserialize)]
struct RawPageRange {
    start: usize,
    end: usize,
}

impl TryFrom<RawPageRange> for PageRange {
    type Error = DocsiftError;

    fn try_from(raw: RawPageRange) -> Result<Self, Self::Error> {
        PageRange::new(raw.start, raw.end)
    }
}

impl PageRange {
    /// Build a range, rejecting page 0 and `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self, DocsiftError> {
        if start < 1 || start > end {
            return Err(DocsiftError::InvalidPageRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of pages in the range.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Check the range fits a document with `total_pages` pages.
    pub fn validate(&self, total_pages: usize) -> Result<(), DocsiftError> {
        if self.end > total_pages {
            return Err(DocsiftError::PageOutOfRange {
                page: self.end,
                total: total_pages,
            });
        }
        Ok(())
    }

    /// 0-indexed first and last page.
    pub fn to_indices(&self) -> (usize, usize) {
        (self.start - 1, self.end - 1)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for PageRange {
    type Err = DocsiftError;

    /// Parse `"5"` or `"3-4"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |p: &str| {
            p.trim().parse::<usize>().map_err(|_| {
                DocsiftError::InvalidConfig(format!("invalid page number '{}'", p.trim()))
            })
        };
        match s.split_once('-') {
            Some((start, end)) => PageRange::new(parse(start)?, parse(end)?),
            None => {
                let page = parse(s)?;
                PageRange::new(page, page)
            }
        }
    }
}
