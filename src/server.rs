// 🌐 HTTP API - Axum router for loan analysis
// POST /analyze (multipart upload) and GET /health

use crate::analysis::AnalysisOutput;
use crate::service::{AnalysisError, LoanAnalyzer};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Multipart field carrying the document
pub const UPLOAD_FIELD: &str = "file";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<LoanAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: LoanAnalyzer) -> Self {
        AppState {
            analyzer: Arc::new(analyzer),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Request-level failure, rendered as `{"detail": ...}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing multipart field `file`")]
    MissingFile,

    #[error("uploaded file is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    Multipart { status: StatusCode, message: String },

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidEncoding | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart { status, .. } => *status,
            ApiError::Analysis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "analysis request failed");
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm_configured: bool,
    schema_enforced: bool,
}

/// GET /health - Liveness and capability flags
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        llm_configured: state.analyzer.llm_configured(),
        schema_enforced: state.analyzer.schema_enforced(),
    })
}

/// POST /analyze - Analyze one uploaded loan agreement
async fn analyze_loan(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisOutput>, ApiError> {
    let bytes = read_upload(multipart?).await?;
    let text = String::from_utf8(bytes).map_err(|_| ApiError::InvalidEncoding)?;

    let output = state.analyzer.analyze(&text).await?;
    Ok(Json(output))
}

/// Bytes of the `file` field; other fields are skipped
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field.bytes().await?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::MissingFile)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/analyze", post(analyze_loan))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RegulatoryContext;
    use crate::llm::{MockTextGenerator, UnconfiguredGenerator};
    use crate::normalizer::ResponseNormalizer;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "loan-risk-test-boundary";
    const DOC: &str = "Loan agreement with a 25% hidden origination fee.";

    fn app_with(generator: Arc<dyn crate::llm::TextGenerator>) -> Router {
        let analyzer = LoanAnalyzer::new(
            generator,
            RegulatoryContext::new("Fees must be disclosed."),
            ResponseNormalizer::new(true),
        );
        build_router(AppState::new(analyzer), 1024 * 1024)
    }

    fn multipart_body(field: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"loan.txt\"\r\n",
                field
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload(field: &str, content: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(field, content)))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_fenced_model_reply_returns_result() {
        let mock = MockTextGenerator::replying(
            "```json\n{\"risk_score\": 0.8, \"summary\": \"High risk due to undisclosed fee.\", \"contradictions\": [], \"hidden_fees\": [\"25% origination fee\"]}\n```",
        );
        let (status, body) = send(app_with(Arc::new(mock.clone())), upload("file", DOC.as_bytes())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "risk_score": 0.8,
                "summary": "High risk due to undisclosed fee.",
                "contradictions": [],
                "hidden_fees": ["25% origination fee"]
            })
        );
        assert!(mock.prompts()[0].contains(DOC));
    }

    #[tokio::test]
    async fn test_llm_failure_is_500_with_message() {
        let mock = MockTextGenerator::failing("quota exceeded");
        let (status, body) = send(app_with(Arc::new(mock)), upload("file", DOC.as_bytes())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "quota exceeded"}));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_500_parse_failure() {
        let mock = MockTextGenerator::replying("I cannot help with that.");
        let (status, body) = send(app_with(Arc::new(mock)), upload("file", DOC.as_bytes())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Failed to parse model output:"), "{}", detail);
    }

    #[tokio::test]
    async fn test_unconfigured_client_is_500_not_startup_failure() {
        let app = app_with(Arc::new(UnconfiguredGenerator::default()));
        let (status, body) = send(app, upload("file", DOC.as_bytes())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_422() {
        let mock = MockTextGenerator::replying("{}");
        let (status, body) = send(app_with(Arc::new(mock.clone())), upload("document", DOC.as_bytes())).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"detail": "missing multipart field `file`"}));
        assert!(mock.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_upload_is_400() {
        let mock = MockTextGenerator::replying("{}");
        let (status, body) = send(app_with(Arc::new(mock.clone())), upload("file", &[0xff, 0xfe, 0x00, 0x41])).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "uploaded file is not valid UTF-8 text");
        assert!(mock.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_oversize_upload_is_413() {
        let mock = MockTextGenerator::replying("{}");
        let analyzer = LoanAnalyzer::new(
            Arc::new(mock.clone()),
            RegulatoryContext::empty(),
            ResponseNormalizer::new(true),
        );
        let app = build_router(AppState::new(analyzer), 64);

        let (status, body) = send(app, upload("file", &[b'a'; 1000])).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["detail"].is_string());
        assert!(mock.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_non_multipart_request_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(app_with(Arc::new(MockTextGenerator::default())), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_health_reports_capabilities() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app_with(Arc::new(UnconfiguredGenerator::default())), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llm_configured"], false);
        assert_eq!(body["schema_enforced"], true);
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "https://lender.example")
            .body(Body::empty())
            .unwrap();
        let response = app_with(Arc::new(MockTextGenerator::default()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
