//! HTTP boundary: upload, query and clear over one shared coordinator.

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use pdf_rag_core::{
    AnswerGenerator, DocumentFingerprint, Embedder, IngestError, QueryError, QueryResult,
    RagCoordinator,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub type Engine = RagCoordinator<Box<dyn Embedder + Send>, Box<dyn AnswerGenerator + Send>>;

/// All four operations go through this lock, so ingestion never interleaves
/// with a query's ranking scan.
pub type SharedEngine = Arc<Mutex<Engine>>;

#[derive(Clone)]
pub struct AppState {
    engine: SharedEngine,
}

impl AppState {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    /// Runs `operation` on a blocking thread while holding the engine lock.
    async fn with_engine<T, F>(&self, operation: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Engine) -> Result<T, ApiError> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || operation(&mut engine.lock()))
            .await
            .map_err(|error| ApiError::internal(format!("worker task failed: {error}")))?
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        let status = match &error {
            IngestError::UnsupportedInput(_) | IngestError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            IngestError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Model(_) => StatusCode::BAD_GATEWAY,
            IngestError::Io(_) | IngestError::InvalidChunkConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            detail: error.to_string(),
        }
    }
}

/// Keeps axum's status, so an upload over the body limit stays a 413.
impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self {
            status: error.status(),
            detail: format!("failed to read upload: {}", error.body_text()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            detail: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, detail = %self.detail, "request failed");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub document: DocumentFingerprint,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(status))
        .route(
            "/upload",
            post(upload_pdf).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/query", post(query_documents))
        .route("/clear", delete(clear_documents))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state, max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn status() -> Json<serde_json::Value> {
    Json(json!({ "status": "RAG Chatbot API is running" }))
}

async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("uploaded file has no name"))?;
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(ApiError::bad_request("Only PDF files are allowed"));
        }

        let bytes = field.bytes().await?;
        info!(filename = %filename, bytes = bytes.len(), "processing upload");

        let name = filename.clone();
        let document = state
            .with_engine(move |engine| Ok(engine.ingest_pdf(&name, &bytes)?))
            .await?;

        return Ok(Json(UploadResponse {
            message: format!("Successfully processed {filename}"),
            filename,
            document,
        }));
    }

    Err(ApiError::bad_request("multipart field `file` is missing"))
}

async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResult>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question is empty"));
    }

    let result = state
        .with_engine(move |engine| {
            if !engine.has_documents() {
                return Err(ApiError::bad_request(
                    "No documents loaded. Please upload a PDF first.",
                ));
            }
            Ok(engine.query(&request.question)?)
        })
        .await?;

    Ok(Json(result))
}

async fn clear_documents(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .with_engine(|engine| {
            engine.clear();
            Ok(())
        })
        .await?;
    Ok(Json(json!({ "message": "All documents cleared" })))
}
