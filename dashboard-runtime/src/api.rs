//! Axum-based dashboard API.
//!
//! Provides REST endpoints for:
//! - Workspace file browsing and editing (path-guarded)
//! - Gateway tool invocation and the canned cron/heartbeat calls built on it
//! - API key and tool usage stores
//! - Skills inventory and heartbeat log summaries

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRequest, Query, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api_types::{
    FilesQuery, HealthResponse, OkResponse, PutKeysRequest, StatusResponse, ToolInvokeRequest,
    TrackUsageRequest, TransformRequest, TransformResponse, WriteFileRequest, WriteFileResponse,
};
use crate::config::{DashboardConfig, DeploymentMode};
use crate::error::{DashboardError, Result};
use crate::gateway::{GatewayClient, ToolCall};
use crate::store::{KeyStore, UsageStore};
use crate::util::now_iso;
use crate::workspace::{FileView, Workspace};
use crate::{MAX_BODY_BYTES, heartbeat, skills};

const MANUAL_HEARTBEAT_TEXT: &str = "Manual heartbeat check";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything a handler needs, built once from [`DashboardConfig`].
#[derive(Clone)]
pub struct DashboardState {
    inner: Arc<StateInner>,
}

struct StateInner {
    config: DashboardConfig,
    workspace: Workspace,
    gateway: GatewayClient,
    keys: KeyStore,
    usage: UsageStore,
}

impl DashboardState {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let workspace = Workspace::new(&config.workspace)?;
        let gateway = GatewayClient::new(&config)?;
        let keys = KeyStore::new(config.keys_file());
        let usage = UsageStore::new(config.usage_file());
        Ok(Self {
            inner: Arc::new(StateInner {
                config,
                workspace,
                gateway,
                keys,
                usage,
            }),
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.inner.workspace
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }

    pub fn keys(&self) -> &KeyStore {
        &self.inner.keys
    }

    pub fn usage(&self) -> &UsageStore {
        &self.inner.usage
    }
}

// ---------------------------------------------------------------------------
// JSON body extractor
// ---------------------------------------------------------------------------

/// `Json<T>` whose rejections keep the `{"error": "..."}` body shape.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(DashboardError))]
pub struct ApiJson<T>(pub T);

// ---------------------------------------------------------------------------
// Health / status endpoints
// ---------------------------------------------------------------------------

async fn health(State(state): State<DashboardState>) -> Json<HealthResponse> {
    let config = state.config();
    Json(HealthResponse {
        ok: true,
        env: config.env.clone(),
        gateway: config.gateway_url.clone(),
    })
}

async fn status(State(state): State<DashboardState>) -> Json<StatusResponse> {
    let config = state.config();
    let workspace = match config.mode {
        DeploymentMode::Local => Some(state.workspace().root().display().to_string()),
        DeploymentMode::Hosted => None,
    };
    Json(StatusResponse {
        ok: true,
        workspace,
        gateway: config.gateway_url.clone(),
        env: config.env.clone(),
        timestamp: now_iso(),
    })
}

async fn gateway_status(State(state): State<DashboardState>) -> Response {
    match state.gateway().status().await {
        Ok(body) => Json(body).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string(), "ok": false })),
        )
            .into_response(),
    }
}

// ---------------------------------------------------------------------------
// File endpoints
// ---------------------------------------------------------------------------

async fn read_file(
    State(state): State<DashboardState>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<FileView>> {
    Ok(Json(state.workspace().view(&query.path).await?))
}

async fn write_file(
    State(state): State<DashboardState>,
    Query(query): Query<FilesQuery>,
    ApiJson(body): ApiJson<WriteFileRequest>,
) -> Result<Json<WriteFileResponse>> {
    let path = state.workspace().write(&query.path, &body.content).await?;
    Ok(Json(WriteFileResponse { ok: true, path }))
}

// ---------------------------------------------------------------------------
// Gateway tool endpoints
// ---------------------------------------------------------------------------

async fn forward(state: &DashboardState, call: ToolCall) -> Result<Json<Value>> {
    Ok(Json(state.gateway().invoke(&call).await?))
}

async fn invoke_tool(
    State(state): State<DashboardState>,
    ApiJson(req): ApiJson<ToolInvokeRequest>,
) -> Result<Json<Value>> {
    forward(&state, req.into_call()?).await
}

async fn cron_jobs(State(state): State<DashboardState>) -> Result<Json<Value>> {
    forward(&state, ToolCall::cron_list()).await
}

async fn heartbeat_run(State(state): State<DashboardState>) -> Result<Json<Value>> {
    forward(&state, ToolCall::cron_wake(MANUAL_HEARTBEAT_TEXT)).await
}

async fn heartbeat_cron(State(state): State<DashboardState>) -> Result<Json<Value>> {
    forward(&state, ToolCall::cron_status()).await
}

async fn ai_transform(
    State(state): State<DashboardState>,
    ApiJson(req): ApiJson<TransformRequest>,
) -> Result<Json<TransformResponse>> {
    if req.prompt.trim().is_empty() {
        return Err(DashboardError::Validation("prompt is required".into()));
    }
    let max_tokens = req.max_tokens.unwrap_or(state.config().ai_max_tokens);
    let result = state
        .gateway()
        .chat_completion(&req.prompt, max_tokens)
        .await
        .inspect_err(|e| tracing::error!("AI transform error: {e}"))?;
    Ok(Json(TransformResponse { ok: true, result }))
}

// ---------------------------------------------------------------------------
// Key and usage endpoints
// ---------------------------------------------------------------------------

async fn get_keys(State(state): State<DashboardState>) -> Result<Json<Value>> {
    let keys = state.keys().get().await?;
    Ok(Json(json!({ "keys": keys })))
}

async fn put_keys(
    State(state): State<DashboardState>,
    ApiJson(req): ApiJson<PutKeysRequest>,
) -> Result<Json<OkResponse>> {
    let keys = req
        .keys
        .ok_or_else(|| DashboardError::Validation("keys is required".into()))?;
    state.keys().put(&keys).await?;
    tracing::info!(services = keys.len(), "updated API keys");
    Ok(Json(OkResponse::ok()))
}

async fn get_usage(State(state): State<DashboardState>) -> Result<Json<Value>> {
    let usage = state.usage().get().await?;
    Ok(Json(json!({ "usage": usage })))
}

async fn track_usage(
    State(state): State<DashboardState>,
    ApiJson(req): ApiJson<TrackUsageRequest>,
) -> Result<Json<OkResponse>> {
    if req.tool.trim().is_empty() {
        return Err(DashboardError::Validation("tool is required".into()));
    }
    state
        .usage()
        .track_usage(&req.tool, req.tokens, req.cost)
        .await?;
    Ok(Json(OkResponse::ok()))
}

// ---------------------------------------------------------------------------
// Skills and heartbeat endpoints
// ---------------------------------------------------------------------------

async fn list_skills(State(state): State<DashboardState>) -> Result<Json<Value>> {
    let skills = skills::list_skills(&state.config().skills_dir()).await?;
    Ok(Json(json!({ "skills": skills })))
}

async fn heartbeat_logs(State(state): State<DashboardState>) -> Json<heartbeat::HeartbeatLogs> {
    Json(heartbeat::read_logs(&state.config().heartbeat_log_file()).await)
}

async fn heartbeat_stats(State(state): State<DashboardState>) -> Json<heartbeat::HeartbeatStats> {
    Json(heartbeat::read_stats(&state.config().heartbeat_log_file()).await)
}

async fn unknown_api_route(uri: axum::http::Uri) -> DashboardError {
    DashboardError::NotFound(uri.path().to_string())
}

// ---------------------------------------------------------------------------
// Auth middleware
// ---------------------------------------------------------------------------

/// Extract a Bearer token from an Authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(|t| t.trim())
}

/// Require `Authorization: Bearer <api_token>` on `/api/*` when a token is
/// configured. Health checks and non-API paths (static assets) stay open.
async fn require_api_token(
    State(state): State<DashboardState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config().api_token.as_deref() else {
        return next.run(request).await;
    };

    let path = request.uri().path();
    if !path.starts_with("/api/") || path == "/api/health" {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token)
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())));

    if authorized {
        next.run(request).await
    } else {
        DashboardError::Unauthorized("missing or invalid API token".into()).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router builder
// ---------------------------------------------------------------------------

fn cors_layer(config: &DashboardConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Gateway proxy routes shared by every deployment mode.
fn gateway_routes() -> Router<DashboardState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/gateway/status", get(gateway_status))
        .route("/api/tools/invoke", post(invoke_tool))
        .route("/api/gateway/tools/invoke", post(invoke_tool))
        .route("/api/cron/jobs", get(cron_jobs))
}

/// Routes that need the local workspace.
fn workspace_routes() -> Router<DashboardState> {
    Router::new()
        .route("/api/files", get(read_file).put(write_file))
        .route("/api/files/read", get(read_file))
        .route("/api/ai/transform", post(ai_transform))
        .route("/api/keys", get(get_keys).put(put_keys))
        .route("/api/tools/usage", get(get_usage))
        .route("/api/tools/usage/track", post(track_usage))
        .route("/api/skills/list", get(list_skills))
        .route("/api/heartbeat/logs", get(heartbeat_logs))
        .route("/api/heartbeat/stats", get(heartbeat_stats))
        .route("/api/heartbeat/cron", get(heartbeat_cron))
        .route("/api/heartbeat/run", post(heartbeat_run))
}

/// Build the dashboard router for the configured deployment mode.
pub fn dashboard_router(state: DashboardState) -> Router {
    let config = state.config().clone();

    let mut router = gateway_routes();
    if config.mode == DeploymentMode::Local {
        router = router.merge(workspace_routes());
    }

    if config.is_production() {
        let index = config.static_dir.join("index.html");
        router = router
            .route("/api/{*rest}", any(unknown_api_route))
            .fallback_service(
            ServeDir::new(&config.static_dir).fallback(ServeFile::new(index)),
        );
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), require_api_token))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn app_with(config: DashboardConfig) -> Router {
        dashboard_router(DashboardState::new(config).unwrap())
    }

    fn app(dir: &TempDir) -> Router {
        app_with(DashboardConfig {
            workspace: dir.path().to_path_buf(),
            // Nothing listens here; gateway calls fail fast.
            gateway_url: "http://127.0.0.1:9".to_string(),
            ..DashboardConfig::default()
        })
    }

    async fn body_json(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir).oneshot(get_req("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["env"], "development");
        assert_eq!(json["gateway"], "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_status_reports_workspace() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir).oneshot(get_req("/api/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["ok"], true);
        assert!(json["workspace"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_file_write_then_read() {
        let dir = TempDir::new().unwrap();

        let response = app(&dir)
            .oneshot(json_req(
                "PUT",
                "/api/files?path=memory/today.md",
                json!({ "content": "hello\nworld" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json, json!({ "ok": true, "path": "memory/today.md" }));

        let response = app(&dir)
            .oneshot(get_req("/api/files?path=memory/today.md"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["type"], "file");
        assert_eq!(json["content"], "hello\nworld");
        assert_eq!(json["path"], "memory/today.md");
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("memory")).unwrap();
        std::fs::write(dir.path().join("memory/a.md"), "a").unwrap();
        std::fs::write(dir.path().join("memory/b.md"), "b").unwrap();

        let response = app(&dir).oneshot(get_req("/api/files?path=memory")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["type"], "directory");

        let mut names: Vec<&str> = json["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert_eq!(json["files"][0]["type"], "file");
    }

    #[tokio::test]
    async fn test_root_listing_without_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("HEARTBEAT.md"), "beat").unwrap();

        let response = app(&dir).oneshot(get_req("/api/files")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["type"], "directory");
        assert_eq!(json["files"][0]["path"], "HEARTBEAT.md");
    }

    #[tokio::test]
    async fn test_files_read_alias_accepts_leading_slash() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("HEARTBEAT.md"), "beat").unwrap();

        let response = app(&dir)
            .oneshot(get_req("/api/files/read?path=/HEARTBEAT.md"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["content"], "beat");
    }

    #[tokio::test]
    async fn test_traversal_denied() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(get_req("/api/files?path=../../etc/passwd"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response.into_body()).await;
        assert!(json["error"].as_str().unwrap().starts_with("Access denied"));
    }

    #[tokio::test]
    async fn test_traversal_write_denied() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(json_req(
                "PUT",
                "/api/files?path=../escape.md",
                json!({ "content": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_file_not_found() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(get_req("/api/files?path=nope.md"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response.into_body()).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_body_keeps_error_shape() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/tools/invoke")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response.into_body()).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_invoke_requires_tool() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(json_req("POST", "/api/tools/invoke", json!({ "args": {} })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invoke_network_failure_is_500() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(json_req(
                "POST",
                "/api/tools/invoke",
                json!({ "tool": "sessions_list" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response.into_body()).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_gateway_status_failure_shape() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir).oneshot(get_req("/api/gateway/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["ok"], false);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_keys_round_trip() {
        let dir = TempDir::new().unwrap();

        let response = app(&dir).oneshot(get_req("/api/keys")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response.into_body()).await, json!({ "keys": {} }));

        let keys = json!({ "brave": { "api_key": "k", "notes": "search", "added": "2026-10-01" } });
        let response = app(&dir)
            .oneshot(json_req("PUT", "/api/keys", json!({ "keys": keys })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response.into_body()).await, json!({ "ok": true }));
        assert!(dir.path().join("config/keys.json").exists());

        let response = app(&dir).oneshot(get_req("/api/keys")).await.unwrap();
        assert_eq!(body_json(response.into_body()).await, json!({ "keys": keys }));
    }

    #[tokio::test]
    async fn test_put_keys_requires_keys() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(json_req("PUT", "/api/keys", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!dir.path().join("config/keys.json").exists());
    }

    #[tokio::test]
    async fn test_usage_tracking() {
        let dir = TempDir::new().unwrap();

        for _ in 0..3 {
            let response = app(&dir)
                .oneshot(json_req(
                    "POST",
                    "/api/tools/usage/track",
                    json!({ "tool": "x", "tokens": 10, "cost": 0.01 }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app(&dir).oneshot(get_req("/api/tools/usage")).await.unwrap();
        let json = body_json(response.into_body()).await;
        assert_eq!(json["usage"]["x"]["calls"], 3);
        assert_eq!(json["usage"]["x"]["tokens"], 30);
        assert!((json["usage"]["x"]["cost"].as_f64().unwrap() - 0.03).abs() < 1e-9);
        assert!(json["usage"]["x"]["lastUsed"].is_string());
    }

    #[tokio::test]
    async fn test_usage_tracking_fractional_tokens() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(json_req(
                "POST",
                "/api/tools/usage/track",
                json!({ "tool": "x", "tokens": 12.5, "cost": 0.01 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&dir)
            .oneshot(json_req(
                "POST",
                "/api/tools/usage/track",
                json!({ "tool": "x", "tokens": null }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(&dir).oneshot(get_req("/api/tools/usage")).await.unwrap();
        let json = body_json(response.into_body()).await;
        assert_eq!(json["usage"]["x"]["calls"], 2);
        assert_eq!(json["usage"]["x"]["tokens"].as_f64(), Some(12.5));
    }

    #[tokio::test]
    async fn test_usage_tracking_leaves_malformed_file_alone() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        let usage_file = dir.path().join("config/tool-usage.json");
        std::fs::write(&usage_file, "{ not json").unwrap();

        let response = app(&dir)
            .oneshot(json_req(
                "POST",
                "/api/tools/usage/track",
                json!({ "tool": "x", "tokens": 1 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response.into_body()).await["error"].is_string());
        assert_eq!(std::fs::read_to_string(&usage_file).unwrap(), "{ not json");

        let response = app(&dir).oneshot(get_req("/api/tools/usage")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response.into_body()).await, json!({ "usage": {} }));
    }

    #[tokio::test]
    async fn test_skills_and_heartbeat_empty_workspace() {
        let dir = TempDir::new().unwrap();

        let response = app(&dir).oneshot(get_req("/api/skills/list")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response.into_body()).await, json!({ "skills": [] }));

        let response = app(&dir).oneshot(get_req("/api/heartbeat/logs")).await.unwrap();
        assert_eq!(
            body_json(response.into_body()).await,
            json!({ "logs": [], "lastRun": null })
        );

        let response = app(&dir).oneshot(get_req("/api/heartbeat/stats")).await.unwrap();
        assert_eq!(
            body_json(response.into_body()).await,
            json!({ "successCount": 0, "errorCount": 0, "avgDuration": 0.0 })
        );
    }

    #[tokio::test]
    async fn test_heartbeat_logs_from_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("memory")).unwrap();
        std::fs::write(
            dir.path().join("memory/heartbeat.log"),
            "2026-10-01T08:00:00Z SUCCESS: first\n2026-10-01T09:00:00Z ERROR: second\n",
        )
        .unwrap();

        let response = app(&dir).oneshot(get_req("/api/heartbeat/logs")).await.unwrap();
        let json = body_json(response.into_body()).await;
        assert_eq!(json["lastRun"], "2026-10-01T09:00:00Z");
        assert_eq!(json["logs"][0]["status"], "error");
        assert_eq!(json["logs"][1]["message"], "first");
    }

    #[tokio::test]
    async fn test_ai_transform_requires_prompt() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(json_req("POST", "/api/ai/transform", json!({ "prompt": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hosted_mode_hides_workspace_routes() {
        let dir = TempDir::new().unwrap();
        let config = DashboardConfig {
            workspace: dir.path().to_path_buf(),
            mode: DeploymentMode::Hosted,
            ..DashboardConfig::default()
        };

        let response = app_with(config.clone())
            .oneshot(get_req("/api/files?path="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app_with(config).oneshot(get_req("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert!(json.get("workspace").is_none());
    }

    #[tokio::test]
    async fn test_api_token_enforced() {
        let dir = TempDir::new().unwrap();
        let config = DashboardConfig {
            workspace: dir.path().to_path_buf(),
            api_token: Some("dash-secret".to_string()),
            ..DashboardConfig::default()
        };

        let response = app_with(config.clone())
            .oneshot(get_req("/api/keys"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app_with(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/keys")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app_with(config.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/keys")
                    .header("authorization", "Bearer dash-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Health stays open for probes.
        let response = app_with(config).oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let dir = TempDir::new().unwrap();
        let response = app(&dir)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/files")
                    .header("origin", "http://localhost:3000")
                    .header("access-control-request-method", "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_production_serves_spa_fallback() {
        let dir = TempDir::new().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("index.html"), "<html>dashboard</html>").unwrap();

        let config = DashboardConfig {
            workspace: dir.path().to_path_buf(),
            env: "production".to_string(),
            static_dir: dist,
            ..DashboardConfig::default()
        };

        let response = app_with(config.clone())
            .oneshot(get_req("/sessions"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<html>dashboard</html>");

        let response = app_with(config).oneshot(get_req("/api/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_json(response.into_body()).await["error"].is_string());
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
