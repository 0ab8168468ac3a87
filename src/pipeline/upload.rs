//! Upload: send the document to the analysis service and read its reply.
//!
//! One multipart `POST` per attempt, with the file under a field named after
//! its [`FileType`](crate::config::FileType). The service answers with a JSON
//! object whose `data.markdown` holds the analysis; [`extract_markdown`] pulls
//! it out and [`merge_document`] writes the structured tree back into `data`.
//!
//! ## Retry Strategy
//!
//! 429, 5xx, timeouts and dropped connections are retried with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`); a `Retry-After` header on a
//! 429 replaces the computed delay. 401/403 and other 4xx answers are final.

use crate::config::AnalysisConfig;
use crate::document::Document;
use crate::error::DocsiftError;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Longest server-requested pause we are willing to honour.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Error bodies are cut to this many characters in messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A successful reply from the analysis service.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub status: u16,
    pub body: Value,
    pub uploaded_bytes: u64,
    pub retries: u32,
    pub duration_ms: u64,
}

/// Post the file at `path` to `config.endpoint`.
///
/// `file_name` is the name the service sees; it is the original input's name
/// even when `path` points at a sliced temp file.
pub async fn post_document(
    path: &Path,
    file_name: &str,
    api_key: &str,
    config: &AnalysisConfig,
) -> Result<UploadResponse, DocsiftError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DocsiftError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    let uploaded_bytes = bytes.len() as u64;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| DocsiftError::Internal(format!("HTTP client: {e}")))?;

    info!(
        "Sending {} ({} bytes) to {} as '{}'",
        file_name,
        uploaded_bytes,
        config.endpoint,
        config.file_type.form_field()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_upload_start(uploaded_bytes);
    }

    let start = Instant::now();
    let mut last_err: Option<DocsiftError> = None;
    let mut retry_after: Option<u64> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = retry_delay(config.retry_backoff_ms, attempt, retry_after);
            let reason = last_err
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            warn!(
                "Upload retry {}/{} after {}ms: {}",
                attempt,
                config.max_retries,
                delay.as_millis(),
                reason
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_retry(attempt, config.max_retries, &reason);
            }
            sleep(delay).await;
        }

        let form = build_form(&bytes, file_name, config)?;
        let sent = client
            .post(&config.endpoint)
            .header(AUTHORIZATION, format!("Basic {api_key}"))
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await;

        let response = match sent {
            Ok(r) => r,
            Err(e) => {
                last_err = Some(request_error(&e, config));
                retry_after = None;
                continue;
            }
        };

        let status = response.status().as_u16();
        debug!("Response status code: {}", status);

        if response.status().is_success() {
            let text = response
                .text()
                .await
                .map_err(|e| request_error(&e, config))?;
            let body: Value = serde_json::from_str(&text).map_err(|e| {
                DocsiftError::InvalidResponse(format!("{e}: {}", truncate(&text)))
            })?;
            let duration_ms = start.elapsed().as_millis() as u64;
            if let Some(ref cb) = config.progress_callback {
                cb.on_response(status, duration_ms);
            }
            return Ok(UploadResponse {
                status,
                body,
                uploaded_bytes,
                retries: attempt,
                duration_ms,
            });
        }

        retry_after = rate_limit_retry_after(status, response.headers());
        let text = response.text().await.unwrap_or_default();
        debug!("Response content: {}", truncate(&text));

        match status {
            401 | 403 => {
                return Err(DocsiftError::AuthError {
                    status,
                    detail: truncate(&text),
                })
            }
            429 => {
                last_err = Some(DocsiftError::RateLimitExceeded {
                    retry_after_secs: retry_after,
                });
            }
            s if s >= 500 => {
                last_err = Some(DocsiftError::ApiError {
                    status: s,
                    body: truncate(&text),
                });
            }
            s => {
                return Err(DocsiftError::ApiError {
                    status: s,
                    body: truncate(&text),
                })
            }
        }
    }

    Err(last_err.unwrap_or_else(|| DocsiftError::Internal("no upload attempt was made".into())))
}

fn build_form(bytes: &[u8], file_name: &str, config: &AnalysisConfig) -> Result<Form, DocsiftError> {
    let part = Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(config.file_type.mime_type())
        .map_err(|e| DocsiftError::Internal(format!("multipart: {e}")))?;
    Ok(Form::new().part(config.file_type.form_field(), part))
}

fn request_error(e: &reqwest::Error, config: &AnalysisConfig) -> DocsiftError {
    if e.is_timeout() {
        DocsiftError::ApiTimeout {
            secs: config.request_timeout_secs,
        }
    } else {
        DocsiftError::RequestFailed {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        }
    }
}

/// Seconds from a numeric `Retry-After` header. Only a 429 reply is a
/// rate-limit hint; on other statuses the header is ignored.
fn rate_limit_retry_after(status: u16, headers: &HeaderMap) -> Option<u64> {
    if status != 429 {
        return None;
    }
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Delay before retry number `attempt` (1-based).
fn retry_delay(backoff_ms: u64, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
    match retry_after_secs {
        Some(secs) => Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)),
        None => Duration::from_millis(backoff_ms.saturating_mul(2u64.saturating_pow(attempt - 1))),
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}\u{2026}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Pull `data.markdown` out of a response body.
///
/// A missing `markdown` key reads as an empty document; a `data` that is not
/// an object, or a `markdown` that is not a string, is an invalid response.
pub fn extract_markdown(body: &Value) -> Result<String, DocsiftError> {
    let data = body
        .get("data")
        .ok_or_else(|| DocsiftError::InvalidResponse("missing 'data' object".into()))?;
    if !data.is_object() {
        return Err(DocsiftError::InvalidResponse(format!(
            "'data' must be an object, got {}",
            json_kind(data)
        )));
    }
    match data.get("markdown") {
        None | Some(Value::Null) => {
            warn!("Response has no 'data.markdown'; structuring an empty document");
            Ok(String::new())
        }
        Some(Value::String(md)) => Ok(md.clone()),
        Some(other) => Err(DocsiftError::InvalidResponse(format!(
            "'data.markdown' must be a string, got {}",
            json_kind(other)
        ))),
    }
}

/// Insert `sections` and `raw_content` into the response's `data` object.
pub fn merge_document(body: &mut Value, doc: &Document) -> Result<(), DocsiftError> {
    let data = body
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| DocsiftError::InvalidResponse("missing 'data' object".into()))?;
    let sections = serde_json::to_value(&doc.sections)
        .map_err(|e| DocsiftError::Internal(format!("serialise sections: {e}")))?;
    let raw = serde_json::to_value(&doc.raw_content)
        .map_err(|e| DocsiftError::Internal(format!("serialise raw content: {e}")))?;
    data.insert("sections".into(), sections);
    data.insert("raw_content".into(), raw);
    Ok(())
}

/// The top-level `timestamp` string, when the service sends one.
pub fn response_timestamp(body: &Value) -> Option<String> {
    body.get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
