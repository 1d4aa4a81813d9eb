use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use brief_core::assistant::{
    Assistant, AssistantError, BackendClient, BackendError, ChatReply, ChatRequest, LlmAssistant,
    SimulatedAssistant, UploadResponse,
};
use brief_core::export::{self, CanonicalDocument, ExportFormat};
use brief_core::feed::{self, FeedRequest, FeedResponse};
use brief_core::provider::{LlmClient, ProviderError};

use crate::config::BriefConfig;

/// Fixed message for the misconfiguration case, distinct from upstream errors.
pub const MISSING_KEY_MESSAGE: &str = "LLM provider API key not configured";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    /// JSON key carrying the message (`error`, or `detail` for scoring).
    key: &'static str,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            key: "error",
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn as_detail(mut self) -> Self {
        self.key = "detail";
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), Value::String(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingApiKey => Self::internal(MISSING_KEY_MESSAGE),
            ProviderError::Upstream { status, body } => Self::new(passthrough(status), body),
            ProviderError::Http(e) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
            ProviderError::Parse(msg) => Self::internal(msg),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status, body } => Self::new(passthrough(status), body),
            BackendError::Http(e) => Self::new(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    }
}

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Provider(e) => e.into(),
            AssistantError::Backend(e) => e.into(),
        }
    }
}

fn passthrough(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Answers `/chat`.
    pub assistant: Arc<dyn Assistant>,
    /// Backs the `/api/llm/*` proxies.
    pub llm: LlmClient,
    /// Remote PDF renderer, when configured.
    pub renderer: Option<BackendClient>,
}

impl AppState {
    /// Build the state from resolved config. Without any provider key and
    /// with `simulate` set, `/chat` is answered by the local simulator.
    pub fn from_config(config: &BriefConfig, simulate: bool) -> Self {
        let llm = LlmClient::new(config.providers.clone());
        let assistant: Arc<dyn Assistant> = if simulate && !config.providers.has_key() {
            Arc::new(SimulatedAssistant::new())
        } else {
            Arc::new(LlmAssistant::new(llm.clone()))
        };
        Self {
            assistant,
            llm,
            renderer: config.pdf_renderer_url.as_deref().map(BackendClient::new),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/upload", post(upload))
        .route("/export/{format}", post(export_plan))
        .route("/generate-feed", post(generate_feed))
        .route("/api/llm/chat", post(llm_chat))
        .route("/api/llm/score", post(llm_score))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &BriefConfig, bind: &str, port: u16, simulate: bool) -> Result<()> {
    let state = AppState::from_config(config, simulate);
    info!(
        assistant = state.assistant.name(),
        pdf_renderer = state.renderer.is_some(),
        "starting brief backend"
    );
    if !config.providers.has_key() {
        warn!("no LLM provider key configured; /api/llm routes will answer 500");
    }

    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("brief serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("brief serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    debug!(messages = request.history.len(), "chat turn");
    let reply = state.assistant.reply(&request).await?;
    Ok(Json(ChatReply { reply }))
}

async fn upload(mut multipart: Multipart) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.to_string()))?;
        let content = String::from_utf8_lossy(&bytes);
        debug!(%filename, bytes = bytes.len(), "upload received");
        return Ok(Json(UploadResponse::from_file(&filename, &content)));
    }
    Err(AppError::bad_request("missing multipart field `file`"))
}

#[derive(Debug, Deserialize)]
struct ExportBody {
    #[serde(default)]
    plan: CanonicalDocument,
}

async fn export_plan(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Json(body): Json<ExportBody>,
) -> Result<axum::response::Response, AppError> {
    let format: ExportFormat = format
        .parse()
        .map_err(|e: export::ExportError| AppError::bad_request(e.to_string()))?;

    let bytes = if format.is_local() {
        export::render(&body.plan, format).map_err(|e| AppError::internal(e.to_string()))?
    } else {
        let Some(renderer) = &state.renderer else {
            return Err(AppError::new(
                StatusCode::NOT_IMPLEMENTED,
                format!("{format} export requires a PDF renderer (set BRIEF_PDF_RENDERER_URL)"),
            ));
        };
        renderer.export(format, &body.plan).await?
    };

    let disposition = format!("attachment; filename=\"brief.{}\"", format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn generate_feed(Json(request): Json<FeedRequest>) -> Json<FeedResponse> {
    Json(FeedResponse {
        feed: feed::generate_feed(&request),
    })
}

async fn llm_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<axum::response::Response, AppError> {
    let completion = state
        .llm
        .chat(&request.history, &request.current_plan)
        .await?;
    Ok(Json(completion).into_response())
}

#[derive(Debug, Deserialize)]
struct ScoreBody {
    #[serde(default)]
    plan: Value,
}

async fn llm_score(
    State(state): State<AppState>,
    Json(body): Json<ScoreBody>,
) -> Result<axum::response::Response, AppError> {
    let score = state
        .llm
        .score(&body.plan)
        .await
        .map_err(|e| AppError::from(e).as_detail())?;
    Ok(Json(score).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use brief_core::provider::{ProviderConfig, ProviderSet};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(providers: ProviderSet, renderer: Option<String>) -> BriefConfig {
        BriefConfig {
            providers,
            backend_url: BackendClient::DEFAULT_URL.to_string(),
            pdf_renderer_url: renderer,
        }
    }

    fn offline_router() -> Router {
        build_router(AppState::from_config(&config(ProviderSet::default(), None), true))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn sample_plan() -> Value {
        json!({
            "campaign_name": "Oat Milk",
            "single_minded_proposition": "Creamy",
            "narrative_brief": "",
            "content_matrix": [{ "asset_id": "row-1", "channel": "email" }],
            "concepts": []
        })
    }

    #[tokio::test]
    async fn test_health() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = offline_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_chat_uses_simulator_without_keys() {
        let body = json!({
            "history": [{ "role": "user", "content": "Launch next spring" }],
            "current_plan": {}
        });
        let resp = post_json(offline_router(), "/chat", body).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["reply"].as_str().unwrap().contains("Launch next spring"));
    }

    #[tokio::test]
    async fn test_chat_without_simulator_reports_missing_key() {
        let app = build_router(AppState::from_config(&config(ProviderSet::default(), None), false));
        let body = json!({ "history": [{ "role": "user", "content": "hi" }] });
        let resp = post_json(app, "/chat", body).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], MISSING_KEY_MESSAGE);
    }

    #[tokio::test]
    async fn test_upload_csv_returns_audience_matrix() {
        let body = "--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"media.csv\"\r\n\
Content-Type: text/csv\r\n\r\n\
Segment,Channel\nStudents,TikTok\n\r\n\
--XBOUNDARY--\r\n";
        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let resp = offline_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["kind"], "audience_matrix");
        assert_eq!(json["headers"], json!(["Segment", "Channel"]));
        assert_eq!(json["rows"][0]["Channel"], "TikTok");
        assert_eq!(json["filename"], "media.csv");
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_bad_request() {
        let body = "--XBOUNDARY\r\n\
Content-Disposition: form-data; name=\"other\"\r\n\r\n\
value\r\n\
--XBOUNDARY--\r\n";
        let req = Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let resp = offline_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_txt_is_attachment() {
        let resp = post_json(offline_router(), "/export/txt", json!({ "plan": sample_plan() })).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"brief.txt\""
        );
        let text = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(text.starts_with("Oat Milk\n========\nSMP: Creamy\n"));
        assert!(text.contains("channel=email"));
    }

    #[tokio::test]
    async fn test_export_unknown_format_is_bad_request() {
        let resp = post_json(offline_router(), "/export/docx", json!({ "plan": {} })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_pdf_without_renderer_is_not_implemented() {
        let resp = post_json(offline_router(), "/export/pdf", json!({ "plan": sample_plan() })).await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert!(body_json(resp).await["error"].as_str().unwrap().contains("renderer"));
    }

    #[tokio::test]
    async fn test_export_pdf_is_forwarded_to_renderer() {
        let renderer = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/export/pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .expect(1)
            .mount(&renderer)
            .await;

        let state = AppState::from_config(&config(ProviderSet::default(), Some(renderer.uri())), true);
        let resp = post_json(build_router(state), "/export/pdf", json!({ "plan": sample_plan() })).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(body_bytes(resp).await, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_generate_feed() {
        let body = json!({
            "audience_strategy": "Morning people\nsecond line",
            "asset_list": ["https://cdn.test/a.png"],
            "media_plan_rows": [{ "id": "r1", "url": "https://shop.test" }]
        });
        let resp = post_json(offline_router(), "/generate-feed", body).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(
            json["feed"][0],
            json!({
                "Unique_ID": "r1",
                "Headline": "Morning people",
                "Image_URL": "https://cdn.test/a.png",
                "Exit_URL": "https://shop.test"
            })
        );
    }

    #[tokio::test]
    async fn test_llm_routes_report_missing_key() {
        let resp = post_json(offline_router(), "/api/llm/chat", json!({ "history": [] })).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], MISSING_KEY_MESSAGE);

        let resp = post_json(offline_router(), "/api/llm/score", json!({ "plan": {} })).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["detail"], MISSING_KEY_MESSAGE);
    }

    #[tokio::test]
    async fn test_llm_chat_passes_upstream_status_through() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&provider)
            .await;

        let providers = ProviderSet {
            anthropic: ProviderConfig::anthropic(Some("k".into())).with_base_url(provider.uri()),
            openai: ProviderConfig::openai(None),
        };
        let app = build_router(AppState::from_config(&config(providers, None), false));
        let body = json!({ "history": [{ "role": "user", "content": "hi" }], "current_plan": {} });
        let resp = post_json(app, "/api/llm/chat", body).await;

        assert_eq!(resp.status().as_u16(), 529);
        assert_eq!(body_json(resp).await["error"], "overloaded");
    }

    #[tokio::test]
    async fn test_llm_score_success() {
        let provider = MockServer::start().await;
        let text = r#"{"quality_score": 7, "gaps": ["No budget"], "rationale": "Solid"}"#;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": text } }]
            })))
            .mount(&provider)
            .await;

        let providers = ProviderSet {
            anthropic: ProviderConfig::anthropic(None),
            openai: ProviderConfig::openai(Some("k".into())).with_base_url(provider.uri()),
        };
        let app = build_router(AppState::from_config(&config(providers, None), false));
        let resp = post_json(app, "/api/llm/score", json!({ "plan": sample_plan() })).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({ "quality_score": 7.0, "gaps": ["No budget"], "rationale": "Solid" })
        );
    }
}
