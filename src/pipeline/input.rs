//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! pdfium and the multipart upload both want a file on disk. URLs are
//! downloaded into a `TempDir` that lives as long as the [`ResolvedInput`],
//! so cleanup happens on drop even when the analysis fails midway. Magic bytes
//! are checked up front: a wrong file type is cheaper to report here than as
//! an opaque 4xx from the analysis service.

use crate::config::FileType;
use crate::error::DocsiftError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The resolved input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the file was downloaded to a temporary directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded {
        path: PathBuf,
        url: String,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    /// Get the path to the file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    /// Base name shown to the user and sent as the upload file name.
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }

    /// Absolute parent directory of a local input, or the source URL.
    pub fn origin(&self) -> String {
        match self {
            ResolvedInput::Local(p) => {
                let abs = std::path::absolute(p).unwrap_or_else(|_| p.clone());
                abs.parent()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default()
            }
            ResolvedInput::Downloaded { url, .. } => url.clone(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local file of the given type.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(
    input: &str,
    file_type: FileType,
    timeout_secs: u64,
) -> Result<ResolvedInput, DocsiftError> {
    if input.trim().is_empty() {
        return Err(DocsiftError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, file_type, timeout_secs).await
    } else {
        resolve_local(input, file_type)
    }
}

/// `true` when the leading bytes match the declared file type.
pub fn magic_matches(file_type: FileType, magic: &[u8; 4]) -> bool {
    match file_type {
        FileType::Pdf => magic == b"%PDF",
        FileType::Image => {
            magic == b"\x89PNG"
                || magic[..3] == [0xFF, 0xD8, 0xFF]
                || magic == b"GIF8"
                || magic == b"II*\0"
                || magic == b"MM\0*"
                || magic[..2] == *b"BM"
                || magic == b"RIFF"
        }
    }
}

fn expected_label(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Pdf => "PDF",
        FileType::Image => "image (PNG, JPEG, GIF, TIFF, BMP or WebP)",
    }
}

/// Resolve a local file path, validating existence and magic bytes.
fn resolve_local(path_str: &str, file_type: FileType) -> Result<ResolvedInput, DocsiftError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(DocsiftError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && !magic_matches(file_type, &magic) {
                return Err(DocsiftError::WrongFileType {
                    path,
                    expected: expected_label(file_type),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocsiftError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(DocsiftError::FileNotFound { path });
        }
    }

    debug!("Resolved local {}: {}", file_type.label(), path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(
    url: &str,
    file_type: FileType,
    timeout_secs: u64,
) -> Result<ResolvedInput, DocsiftError> {
    info!("Downloading {} from: {}", file_type.label(), url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DocsiftError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DocsiftError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            DocsiftError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(DocsiftError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = filename_from_url(url, file_type);

    let temp_dir = TempDir::new().map_err(|e| DocsiftError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DocsiftError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if bytes.len() >= 4 {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if !magic_matches(file_type, &magic) {
            return Err(DocsiftError::WrongFileType {
                path: file_path,
                expected: expected_label(file_type),
                magic,
            });
        }
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| DocsiftError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        url: url.to_string(),
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL when it looks like a file name.
fn filename_from_url(url: &str, file_type: FileType) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    match file_type {
        FileType::Pdf => "downloaded.pdf".to_string(),
        FileType::Image => "downloaded.jpg".to_string(),
    }
}
