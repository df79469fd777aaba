//! HTTP surface for AskPDF.
//!
//! - `GET /` – Liveness probe.
//! - `POST /upload` – Multipart upload of a PDF (field `file`). Creates a session and returns
//!   `{ "session_id", "filename", "summary" }`.
//! - `POST /query` – JSON `{ "session_id", "query" }`, answered from that session's document as
//!   `{ "answer" }`. Unknown sessions yield 404.
//!
//! Failures are reported as `{ "detail": "..." }` with a generic message; the underlying error
//! is logged and never sent to the client. CORS is fully permissive.

use crate::processing::{DocumentApi, QueryError, UploadError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

const UPLOAD_FIELD: &str = "file";

/// Build the HTTP router over the document pipeline.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: DocumentApi + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/upload", post(upload_document::<S>))
        .route("/query", post(query_document::<S>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(service)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Backend is running",
    })
}

/// Success response for `POST /upload`.
#[derive(Serialize)]
struct UploadResponse {
    session_id: String,
    filename: String,
    summary: String,
}

/// Ingest the uploaded PDF into a new session and summarize it.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DocumentApi,
{
    let (filename, bytes) = read_upload(&mut multipart).await?;
    let outcome = service.upload(&filename, bytes).await?;
    tracing::info!(
        session_id = %outcome.session_id,
        filename = %filename,
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        session_id: outcome.session_id,
        filename,
        summary: outcome.summary,
    }))
}

/// Pick the `file` field, or else the first field that carries a filename.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await? {
        let named_file = field.name() == Some(UPLOAD_FIELD);
        let filename = field.file_name().map(str::to_string);
        if !named_file && filename.is_none() {
            continue;
        }

        let bytes = field.bytes().await?;
        let upload = (filename.unwrap_or_default(), bytes.to_vec());
        if named_file {
            return Ok(upload);
        }
        fallback.get_or_insert(upload);
    }
    fallback.ok_or(AppError::MissingFile)
}

/// Request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    session_id: String,
    query: String,
}

/// Success response for `POST /query`.
#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

/// Answer a question against a previously uploaded document.
async fn query_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: DocumentApi,
{
    let answer = service.query(&request.session_id, &request.query).await?;
    Ok(Json(QueryResponse { answer }))
}

enum AppError {
    Upload(UploadError),
    Query(QueryError),
    Multipart(MultipartError),
    MissingFile,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Upload(UploadError::Ingest(error)) => {
                tracing::error!(error = %error, "Failed to process and save PDF");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process and save PDF.".to_string(),
                )
            }
            Self::Upload(UploadError::Summary(error)) => {
                tracing::error!(error = %error, "Failed to generate summary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate summary.".to_string(),
                )
            }
            Self::Query(QueryError::SessionNotFound(session_id)) => {
                tracing::info!(session_id = %session_id, "Query for unknown session");
                (StatusCode::NOT_FOUND, "Session not found.".to_string())
            }
            Self::Query(error) => {
                tracing::error!(error = %error, "Failed to process query");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process query.".to_string(),
                )
            }
            Self::Multipart(error) => {
                tracing::warn!(error = %error, "Rejected malformed upload");
                (error.status(), error.body_text())
            }
            Self::MissingFile => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Missing `{UPLOAD_FIELD}` upload field."),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(inner: UploadError) -> Self {
        Self::Upload(inner)
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        Self::Query(inner)
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::processing::{
        DocumentApi, IngestError, QueryError, SummaryError, UploadError, UploadOutcome,
    };
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
        response::Response,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "askpdf-test-boundary";

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        IngestFails,
        SummaryFails,
        SessionMissing,
        QueryFails,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Upload { filename: String, bytes: Vec<u8> },
        Query { session_id: String, question: String },
    }

    struct StubDocumentService {
        behavior: Behavior,
        calls: Mutex<Vec<Call>>,
    }

    impl StubDocumentService {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: Mutex::new(Vec::new()),
            })
        }

        async fn recorded_calls(&self) -> Vec<Call> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl DocumentApi for StubDocumentService {
        async fn upload(
            &self,
            filename: &str,
            bytes: Vec<u8>,
        ) -> Result<UploadOutcome, UploadError> {
            self.calls.lock().await.push(Call::Upload {
                filename: filename.to_string(),
                bytes,
            });
            match self.behavior {
                Behavior::IngestFails => Err(IngestError::NoText.into()),
                Behavior::SummaryFails => Err(SummaryError::NoChunks.into()),
                _ => Ok(UploadOutcome {
                    session_id: "session-1".into(),
                    summary: "A short summary.".into(),
                }),
            }
        }

        async fn query(&self, session_id: &str, question: &str) -> Result<String, QueryError> {
            self.calls.lock().await.push(Call::Query {
                session_id: session_id.to_string(),
                question: question.to_string(),
            });
            match self.behavior {
                Behavior::SessionMissing => Err(QueryError::SessionNotFound(session_id.into())),
                Behavior::QueryFails => Err(QueryError::EmptyEmbedding),
                _ => Ok("The answer.".into()),
            }
        }
    }

    fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let disposition = match filename {
            Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
            None => format!("form-data; name=\"{field}\""),
        };
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn query_request(payload: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn root_reports_status() {
        let app = create_router(StubDocumentService::new(Behavior::Succeed), 1024);
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "Backend is running");
    }

    #[tokio::test]
    async fn upload_returns_session_filename_and_summary() {
        let service = StubDocumentService::new(Behavior::Succeed);
        let app = create_router(service.clone(), 1024 * 1024);

        let response = app
            .oneshot(upload_request(multipart_body(
                "file",
                Some("report.pdf"),
                b"%PDF-1.5 bytes",
            )))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({
                "session_id": "session-1",
                "filename": "report.pdf",
                "summary": "A short summary."
            })
        );
        assert_eq!(
            service.recorded_calls().await,
            vec![Call::Upload {
                filename: "report.pdf".into(),
                bytes: b"%PDF-1.5 bytes".to_vec(),
            }]
        );
    }

    #[tokio::test]
    async fn upload_accepts_any_field_carrying_a_filename() {
        let service = StubDocumentService::new(Behavior::Succeed);
        let app = create_router(service.clone(), 1024 * 1024);

        let response = app
            .oneshot(upload_request(multipart_body(
                "document",
                Some("other.pdf"),
                b"x",
            )))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["filename"], "other.pdf");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_unprocessable() {
        let service = StubDocumentService::new(Behavior::Succeed);
        let app = create_router(service.clone(), 1024 * 1024);

        let response = app
            .oneshot(upload_request(multipart_body("note", None, b"hello")))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn upload_failures_return_generic_details() {
        for (behavior, detail) in [
            (Behavior::IngestFails, "Failed to process and save PDF."),
            (Behavior::SummaryFails, "Failed to generate summary."),
        ] {
            let app = create_router(StubDocumentService::new(behavior), 1024 * 1024);
            let response = app
                .oneshot(upload_request(multipart_body("file", Some("a.pdf"), b"x")))
                .await
                .expect("response");

            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(json_body(response).await, json!({ "detail": detail }));
        }
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let service = StubDocumentService::new(Behavior::Succeed);
        let app = create_router(service.clone(), 64);

        let response = app
            .oneshot(upload_request(multipart_body(
                "file",
                Some("big.pdf"),
                &[b'a'; 4096],
            )))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn query_returns_answer() {
        let service = StubDocumentService::new(Behavior::Succeed);
        let app = create_router(service.clone(), 1024);

        let response = app
            .oneshot(query_request(json!({
                "session_id": "abc",
                "query": "What is it?"
            })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "answer": "The answer." }));
        assert_eq!(
            service.recorded_calls().await,
            vec![Call::Query {
                session_id: "abc".into(),
                question: "What is it?".into(),
            }]
        );
    }

    #[tokio::test]
    async fn query_unknown_session_is_404() {
        let app = create_router(StubDocumentService::new(Behavior::SessionMissing), 1024);
        let response = app
            .oneshot(query_request(json!({ "session_id": "nope", "query": "?" })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({ "detail": "Session not found." })
        );
    }

    #[tokio::test]
    async fn query_failure_is_500_without_internal_detail() {
        let app = create_router(StubDocumentService::new(Behavior::QueryFails), 1024);
        let response = app
            .oneshot(query_request(json!({ "session_id": "abc", "query": "?" })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "detail": "Failed to process query." })
        );
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let app = create_router(StubDocumentService::new(Behavior::Succeed), 1024);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/query")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
    }
}
