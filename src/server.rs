//! HTTP front-end: a single configured PDF, analysed two pages at a time.
//!
//! The server owns one document path; visitors pick a page range in the
//! browser and get back the structured tree for those pages. Every request
//! goes through the same [`analyze`](crate::analyze::analyze) call as the CLI,
//! with the page cap enforced before anything is uploaded.

use crate::analyze::analyze;
use crate::config::{AnalysisConfig, FileType, PageRange};
use crate::error::DocsiftError;
use crate::output::AnalysisOutput;
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Default cap on pages per request.
pub const DEFAULT_MAX_PAGES: usize = 2;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// State shared across handlers.
#[derive(Clone)]
pub struct ServerState {
    /// Base analysis settings; `pages` and `max_pages` are set per request.
    pub config: Arc<AnalysisConfig>,
    /// The PDF every request analyses.
    pub pdf_path: PathBuf,
    /// Largest page range a single request may ask for.
    pub max_pages: usize,
}

impl ServerState {
    pub fn new(config: AnalysisConfig, pdf_path: impl Into<PathBuf>) -> Self {
        Self {
            config: Arc::new(config),
            pdf_path: pdf_path.into(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }
}

/// Raw form fields. Kept as strings so a bad number is our 400, not a
/// rejection from the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeForm {
    pub start_page: Option<String>,
    pub end_page: Option<String>,
}

type HandlerError = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(json!({ "error": message.into() })))
}

/// Build the router with all endpoints.
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_pages))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn start_server(addr: &str, state: ServerState) -> Result<(), std::io::Error> {
    info!(
        "Starting server on {} for {}",
        addr,
        state.pdf_path.display()
    );
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /analyze` with `start_page` / `end_page` form fields (defaults 1 and 2).
async fn analyze_pages(
    State(state): State<ServerState>,
    form: Result<Form<AnalyzeForm>, FormRejection>,
) -> Result<Json<Value>, HandlerError> {
    let form = match form {
        Ok(Form(f)) => f,
        Err(e) => {
            warn!("Unreadable form, using default pages: {}", e);
            AnalyzeForm::default()
        }
    };

    let range = parse_range(&form, state.max_pages)?;

    if !state.pdf_path.is_file() {
        error!("PDF file not found: {}", state.pdf_path.display());
        return Err(error_response(StatusCode::NOT_FOUND, "PDF file not found"));
    }

    let mut config = (*state.config).clone();
    config.file_type = FileType::Pdf;
    config.pages = Some(range);
    config.max_pages = Some(state.max_pages);

    info!("Analyzing pages {} of {}", range, state.pdf_path.display());
    let input = state.pdf_path.to_string_lossy().to_string();
    let output = analyze(&input, &config).await.map_err(|e| {
        error!("Analysis failed: {}", e);
        match e {
            DocsiftError::FileNotFound { .. } => {
                error_response(StatusCode::NOT_FOUND, "PDF file not found")
            }
            e if e.is_client_error() => error_response(StatusCode::BAD_REQUEST, e.to_string()),
            e => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred: {e}"),
            ),
        }
    })?;

    Ok(Json(success_body(&output, range)))
}

/// Validate the form into a range within `max_pages`.
fn parse_range(form: &AnalyzeForm, max_pages: usize) -> Result<PageRange, HandlerError> {
    let page = |field: &Option<String>, name: &str, default: usize| -> Result<usize, HandlerError> {
        match field.as_deref().map(str::trim) {
            None | Some("") => Ok(default),
            Some(v) => v.parse::<usize>().map_err(|_| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid {name}: '{v}' is not a page number"),
                )
            }),
        }
    };

    let start = page(&form.start_page, "start_page", 1)?;
    let end = page(&form.end_page, "end_page", 2)?;

    let range = PageRange::new(start, end)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.to_string()))?;

    if range.len() > max_pages {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("Maximum {max_pages} pages can be analyzed at once"),
        ));
    }
    Ok(range)
}

fn success_body(output: &AnalysisOutput, range: PageRange) -> Value {
    let assets: Vec<_> = output.document.assets().collect();
    json!({
        "success": true,
        "content": output.markdown,
        "raw_content": output.document.raw_content,
        "metadata": {
            "file_name": output.metadata.file_name,
            "file_type": output.metadata.file_type.label(),
            "folder_path": output.metadata.folder_path,
            "page_range": range.to_string(),
            "total_pages": output.metadata.total_pages,
            "analysis_timestamp": output.metadata.analysis_timestamp,
            "sections": output.document.sections,
            "assets": assets,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(start: Option<&str>, end: Option<&str>) -> AnalyzeForm {
        AnalyzeForm {
            start_page: start.map(str::to_string),
            end_page: end.map(str::to_string),
        }
    }

    #[test]
    fn defaults_are_pages_one_and_two() {
        let r = parse_range(&form(None, None), 2).unwrap();
        assert_eq!((r.start(), r.end()), (1, 2));
        let r = parse_range(&form(Some(""), Some(" ")), 2).unwrap();
        assert_eq!((r.start(), r.end()), (1, 2));
    }

    #[test]
    fn rejects_ranges_over_the_cap() {
        let (status, Json(body)) = parse_range(&form(Some("1"), Some("3")), 2).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Maximum 2 pages can be analyzed at once");
    }

    #[test]
    fn rejects_non_numbers_and_reversed_ranges() {
        let (status, _) = parse_range(&form(Some("one"), None), 2).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = parse_range(&form(Some("4"), Some("3")), 2).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = parse_range(&form(Some("0"), Some("1")), 2).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn success_body_shape() {
        let document = crate::structure::structure(
            "# Intro\n**Asset Type:** Image\n**Tag:** fig1\n## Goals\nAnalyzed: y",
        );
        let output = AnalysisOutput {
            response: json!({}),
            markdown: "md".into(),
            document,
            metadata: crate::output::AnalysisMetadata {
                file_name: "doc.pdf".into(),
                file_type: FileType::Pdf,
                folder_path: "/srv".into(),
                page_range: None,
                total_pages: Some(2),
                analysis_timestamp: None,
            },
            stats: Default::default(),
        };
        let body = success_body(&output, PageRange::new(3, 4).unwrap());
        assert_eq!(body["success"], true);
        assert_eq!(body["content"], "md");
        assert_eq!(body["metadata"]["file_type"], "PDF");
        assert_eq!(body["metadata"]["page_range"], "3-4");
        assert_eq!(body["metadata"]["total_pages"], 2);
        assert_eq!(body["metadata"]["assets"][0]["tag"], "fig1");
        assert_eq!(body["metadata"]["sections"][0]["subsections"][0]["analyzed_text"], "y");
        assert!(body["metadata"]["analysis_timestamp"].is_null());
    }
}
