//! `analyze` against an in-process mock of the analysis service.
//!
//! Inputs are tiny PNG files, so no pdfium library is needed.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use docsift::{
    analyze, analyze_from_bytes, AnalysisConfig, AnalysisProgressCallback, DocsiftError, FileType,
    PageRange,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n-not-really-an-image-";

const MARKDOWN: &str = "# Intro\n\
## Goals\n\
Original: raw goals\n\
Analyzed: clean goals\n\
**Asset Type:** Image\n\
**Description:** A chart\n\
**Tag:** fig1\n\
\n\
# Specs\n\
## Size\n\
Analyzed: 10cm\n\
extra line";

// ── Mock upstream ────────────────────────────────────────────────────────────

/// A request as the mock saw it.
#[derive(Debug, Clone)]
struct Seen {
    authorization: String,
    accept: String,
    content_type: String,
    body: String,
}

/// Replies are served in order; the last one repeats.
struct Mock {
    replies: Vec<(u16, String)>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Seen>>,
}

impl Mock {
    fn new(replies: Vec<(u16, String)>) -> Arc<Self> {
        Arc::new(Self {
            replies,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn upstream(State(mock): State<Arc<Mock>>, headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
    let n = mock.calls.fetch_add(1, Ordering::SeqCst);
    let get = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    mock.seen.lock().unwrap().push(Seen {
        authorization: get(header::AUTHORIZATION),
        accept: get(header::ACCEPT),
        content_type: get(header::CONTENT_TYPE),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, reply) = mock.replies[n.min(mock.replies.len() - 1)].clone();
    (StatusCode::from_u16(status).unwrap(), reply)
}

/// Serve `mock` on an ephemeral port and return its endpoint URL.
async fn spawn_mock(mock: Arc<Mock>) -> String {
    let app = Router::new()
        .route("/v1/tools/agentic-document-analysis", post(upstream))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1/tools/agentic-document-analysis")
}

fn ok_reply(markdown: &str) -> (u16, String) {
    (
        200,
        json!({
            "data": { "markdown": markdown, "chunks": [] },
            "errors": [],
            "timestamp": "2026-03-01T12:00:00Z"
        })
        .to_string(),
    )
}

fn png_file(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, PNG_BYTES).unwrap();
    path
}

fn image_config(endpoint: &str) -> AnalysisConfig {
    AnalysisConfig::builder()
        .api_key("test-key")
        .endpoint(endpoint)
        .file_type(FileType::Image)
        .max_retries(2)
        .retry_backoff_ms(1)
        .request_timeout_secs(10)
        .build()
        .unwrap()
}

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl AnalysisProgressCallback for Recorder {
    fn on_analysis_start(&self, file_name: &str) {
        self.0.lock().unwrap().push(format!("start {file_name}"));
    }
    fn on_upload_start(&self, bytes: u64) {
        self.0.lock().unwrap().push(format!("upload {bytes}"));
    }
    fn on_retry(&self, attempt: u32, max_retries: u32, _reason: &str) {
        self.0.lock().unwrap().push(format!("retry {attempt}/{max_retries}"));
    }
    fn on_response(&self, status: u16, _elapsed_ms: u64) {
        self.0.lock().unwrap().push(format!("response {status}"));
    }
    fn on_analysis_complete(&self, sections: usize, assets: usize) {
        self.0.lock().unwrap().push(format!("complete {sections} {assets}"));
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merges_structure_into_response() {
    let mock = Mock::new(vec![ok_reply(MARKDOWN)]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let out = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap();

    // Tree
    assert_eq!(out.markdown, MARKDOWN);
    assert_eq!(out.document.sections.len(), 2);
    let intro = &out.document.sections[0];
    assert_eq!(intro.title, "Intro");
    assert_eq!(intro.subsections[0].original_text, "raw goals");
    assert_eq!(intro.subsections[0].analyzed_text, "clean goals");
    assert_eq!(intro.assets[0].asset_type, "Image");
    assert_eq!(intro.assets[0].description, "A chart");
    assert_eq!(intro.assets[0].tag, "fig1");
    assert_eq!(
        out.document.sections[1].subsections[0].analyzed_text,
        "10cm\nextra line"
    );
    assert_eq!(out.document.raw_content.len(), 12);

    // Response keeps upstream fields and gains the structure
    let data = &out.response["data"];
    assert_eq!(data["chunks"], json!([]));
    assert_eq!(data["sections"][1]["title"], "Specs");
    assert_eq!(data["sections"][0]["assets"][0]["type"], "Image");
    assert_eq!(data["raw_content"][0], "# Intro");
    assert_eq!(data["raw_content"][7], "");

    // Metadata and stats
    assert_eq!(out.metadata.file_name, "scan.png");
    assert_eq!(out.metadata.file_type, FileType::Image);
    assert_eq!(out.metadata.page_range, None);
    assert_eq!(out.metadata.total_pages, None);
    assert_eq!(
        out.metadata.analysis_timestamp.as_deref(),
        Some("2026-03-01T12:00:00Z")
    );
    assert_eq!(out.stats.uploaded_bytes, PNG_BYTES.len() as u64);
    assert_eq!(out.stats.retries, 0);
    assert_eq!(out.stats.section_count, 2);
    assert_eq!(out.stats.subsection_count, 2);
    assert_eq!(out.stats.asset_count, 1);

    // What went over the wire
    assert_eq!(mock.calls(), 1);
    let seen = mock.seen.lock().unwrap()[0].clone();
    assert_eq!(seen.authorization, "Basic test-key");
    assert_eq!(seen.accept, "application/json");
    assert!(seen.content_type.starts_with("multipart/form-data"));
    assert!(seen.body.contains("name=\"image\""), "body: {}", seen.body);
    assert!(seen.body.contains("filename=\"scan.png\""));
    assert!(seen.body.to_lowercase().contains("content-type: image/jpeg"));
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let mock = Mock::new(vec![(500, "upstream exploded".into()), ok_reply("# Only")]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let recorder = Arc::new(Recorder::default());
    let mut config = image_config(&endpoint);
    config.progress_callback = Some(recorder.clone());

    let out = analyze(path.to_str().unwrap(), &config).await.unwrap();

    assert_eq!(mock.calls(), 2);
    assert_eq!(out.stats.retries, 1);
    assert_eq!(out.document.sections[0].title, "Only");
    assert_eq!(
        recorder.events(),
        vec![
            "start scan.png".to_string(),
            format!("upload {}", PNG_BYTES.len()),
            "retry 1/2".to_string(),
            "response 200".to_string(),
            "complete 1 0".to_string(),
        ]
    );
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let mock = Mock::new(vec![(503, "busy".into())]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let err = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap_err();

    assert!(matches!(err, DocsiftError::ApiError { status: 503, .. }), "got: {err}");
    assert_eq!(mock.calls(), 3);
}

#[tokio::test]
async fn auth_failure_is_not_retried() {
    let mock = Mock::new(vec![(401, "{\"error\":\"bad key\"}".into())]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let err = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap_err();

    match err {
        DocsiftError::AuthError { status, ref detail } => {
            assert_eq!(status, 401);
            assert!(detail.contains("bad key"));
        }
        other => panic!("expected AuthError, got {other}"),
    }
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let mock = Mock::new(vec![(422, "unsupported file".into())]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let err = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap_err();

    assert!(matches!(err, DocsiftError::ApiError { status: 422, .. }), "got: {err}");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn non_string_markdown_is_invalid() {
    let mock = Mock::new(vec![(200, json!({ "data": { "markdown": 42 } }).to_string())]);
    let endpoint = spawn_mock(mock).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let err = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap_err();
    assert!(matches!(err, DocsiftError::InvalidResponse(_)), "got: {err}");
}

#[tokio::test]
async fn non_json_body_is_invalid() {
    let mock = Mock::new(vec![(200, "<html>oops</html>".into())]);
    let endpoint = spawn_mock(mock).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let err = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap_err();
    assert!(matches!(err, DocsiftError::InvalidResponse(_)), "got: {err}");
}

#[tokio::test]
async fn missing_markdown_yields_empty_document() {
    let mock = Mock::new(vec![(200, json!({ "data": {} }).to_string())]);
    let endpoint = spawn_mock(mock).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let out = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap();
    assert!(out.document.is_empty());
    assert_eq!(out.document.raw_content, vec![String::new()]);
    assert_eq!(out.response["data"]["sections"], json!([]));
    assert_eq!(out.response["data"]["raw_content"], json!([""]));
}

#[tokio::test]
async fn page_range_is_ignored_for_images() {
    let mock = Mock::new(vec![ok_reply("# A")]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = png_file(&dir, "scan.png");

    let mut config = image_config(&endpoint);
    config.pages = Some(PageRange::new(1, 2).unwrap());

    let out = analyze(path.to_str().unwrap(), &config).await.unwrap();
    assert_eq!(out.metadata.page_range, None);
    assert_eq!(out.stats.uploaded_bytes, PNG_BYTES.len() as u64);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn wrong_file_type_fails_before_upload() {
    let mock = Mock::new(vec![ok_reply("# A")]);
    let endpoint = spawn_mock(mock.clone()).await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"just some text").unwrap();

    let err = analyze(path.to_str().unwrap(), &image_config(&endpoint))
        .await
        .unwrap_err();
    assert!(matches!(err, DocsiftError::WrongFileType { .. }), "got: {err}");
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn analyze_from_bytes_uploads_a_temp_file() {
    let mock = Mock::new(vec![ok_reply("# From bytes")]);
    let endpoint = spawn_mock(mock.clone()).await;

    let out = analyze_from_bytes(PNG_BYTES, &image_config(&endpoint))
        .await
        .unwrap();
    assert_eq!(out.document.sections[0].title, "From bytes");
    assert!(out.metadata.file_name.starts_with("docsift-"));
    assert!(out.metadata.file_name.ends_with(".jpg"));
    assert_eq!(mock.calls(), 1);
}
