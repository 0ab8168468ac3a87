//! Error types for the docsift library.
//!
//! The markdown structurer itself never fails: every string has a structure,
//! even if it is an empty one. Everything that can go wrong lives in the glue
//! around it (reading the input, slicing the PDF, talking to the analysis
//! service), and all of it is reported through a single fatal error type,
//! [`DocsiftError`]. There is no partial result: one upload, one response.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docsift library.
#[derive(Debug, Error)]
pub enum DocsiftError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was read but its leading bytes do not match the declared type.
    #[error("File '{path}' is not a valid {expected}\nFirst bytes: {magic:?}")]
    WrongFileType {
        path: PathBuf,
        expected: &'static str,
        magic: [u8; 4],
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Invalid page numbers: page {page} is out of range (PDF has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// A page range is malformed (zero page, start after end).
    #[error("Invalid page range {start}-{end}: pages are 1-indexed and start must be <= end")]
    InvalidPageRange { start: usize, end: usize },

    /// The range is longer than the configured per-request cap.
    #[error("Maximum {max} pages can be analyzed at once (requested {requested})")]
    TooManyPages { requested: usize, max: usize },

    /// pdfium failed while copying pages into the slice or saving it.
    #[error("Failed to extract pages {range}: {detail}")]
    SliceFailed { range: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Page slicing needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Analysis API errors ───────────────────────────────────────────────
    /// No API key in the config or the environment.
    #[error("No API key configured.\nSet LANDING_AI_API_KEY or pass --api-key.")]
    MissingApiKey,

    /// The request could not be sent or the connection dropped.
    #[error("Request to '{endpoint}' failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    /// The API returned a non-retryable or final error status.
    #[error("Analysis API returned HTTP {status}: {body}")]
    ApiError { status: u16, body: String },

    /// The API returned HTTP 429 on every attempt.
    #[error("Rate limit exceeded by the analysis API")]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    /// The API call timed out on every attempt.
    #[error("Analysis API call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The API rejected the credentials (401/403); retrying will not help.
    #[error("Authentication error from the analysis API (HTTP {status}): {detail}")]
    AuthError { status: u16, detail: String },

    /// The response body is not the JSON shape we expect.
    #[error("Invalid response from the analysis API: {0}")]
    InvalidResponse(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read a local file (markdown input, upload payload).
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocsiftError {
    /// `true` for failures a caller should report as bad input rather than
    /// as a server-side problem.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocsiftError::PageOutOfRange { .. }
                | DocsiftError::InvalidPageRange { .. }
                | DocsiftError::TooManyPages { .. }
                | DocsiftError::InvalidInput { .. }
                | DocsiftError::WrongFileType { .. }
                | DocsiftError::PasswordRequired { .. }
                | DocsiftError::WrongPassword { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = DocsiftError::PageOutOfRange { page: 9, total: 4 };
        let msg = e.to_string();
        assert!(msg.contains("page 9"), "got: {msg}");
        assert!(msg.contains("4 pages"), "got: {msg}");
    }

    #[test]
    fn too_many_pages_display() {
        let e = DocsiftError::TooManyPages {
            requested: 3,
            max: 2,
        };
        assert!(e.to_string().starts_with("Maximum 2 pages can be analyzed at once"));
    }

    #[test]
    fn api_error_display() {
        let e = DocsiftError::ApiError {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(e.to_string().contains("HTTP 502"));
        assert!(e.to_string().contains("bad gateway"));
    }

    #[test]
    fn auth_error_display() {
        let e = DocsiftError::AuthError {
            status: 401,
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("401"));
        assert!(e.to_string().contains("invalid key"));
    }

    #[test]
    fn missing_api_key_mentions_env_var() {
        assert!(DocsiftError::MissingApiKey
            .to_string()
            .contains("LANDING_AI_API_KEY"));
    }

    #[test]
    fn client_error_classification() {
        assert!(DocsiftError::TooManyPages {
            requested: 3,
            max: 2
        }
        .is_client_error());
        assert!(!DocsiftError::MissingApiKey.is_client_error());
        assert!(!DocsiftError::ApiTimeout { secs: 5 }.is_client_error());
    }
}
