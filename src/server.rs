//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/sources` | Built-in sources and whether they are active |
//! | `POST` | `/api/osint` | Investigate a query across all applicable sources |
//! | `POST` | `/api/similar-cases` | Cases similar to an existing case |
//! | `GET`  | `/api/similar-cases?query=&limit=` | Free-text semantic search |
//! | `GET`  | `/api/cases` | List cases (`riskLevel`, `queryType`, `userId`, `limit`) |
//! | `POST` | `/api/cases` | Save an investigation as a case |
//! | `DELETE` | `/api/cases?id=` | Delete a case and its embedding |
//! | `GET`  | `/api/cases/{id}` | Fetch one case |
//! | `PATCH` | `/api/cases/{id}` | Update case fields |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `embeddings_disabled` (400),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use osint_harness_core::models::{Case, CaseFilter, QueryType, RiskLevel, SimilarityMatch};

use crate::analysis::RiskAnalysis;
use crate::app::App;
use crate::cases::{case_title, today, CaseUpdate, NewCase};
use crate::investigate::{InvestigateRequest, InvestigateResponse, DEFAULT_USER_ID};
use crate::sources::status::{source_statuses, SourceStatus};

#[derive(Clone)]
struct AppState {
    app: Arc<App>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process
/// is terminated.
pub async fn run_server(app: Arc<App>) -> anyhow::Result<()> {
    let bind_addr = app.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "server listening");
    println!("OSINT server listening on http://{}", bind_addr);

    axum::serve(listener, router(app)).await?;
    Ok(())
}

/// Build the router without binding, for embedding or tests.
pub fn router(app: Arc<App>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/sources", get(handle_sources))
        .route("/api/osint", post(handle_osint))
        .route(
            "/api/similar-cases",
            post(handle_similar_cases).get(handle_semantic_search),
        )
        .route(
            "/api/cases",
            get(handle_list_cases)
                .post(handle_create_case)
                .delete(handle_delete_case),
        )
        .route(
            "/api/cases/{id}",
            get(handle_get_case).patch(handle_update_case),
        )
        .layer(cors)
        .with_state(AppState { app })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

/// Map a storage/similarity failure onto the error contract.
fn core_error(state: &AppState, err: osint_harness_core::Error) -> AppError {
    use osint_harness_core::Error;
    match err {
        Error::CaseNotFound(id) => not_found(format!("case not found: {}", id)),
        Error::EmbeddingFailure(_) if !state.app.config.embedding.is_enabled() => AppError {
            status: StatusCode::BAD_REQUEST,
            code: "embeddings_disabled",
            message: "similarity search requires an embedding provider; set [embedding] provider"
                .to_string(),
        },
        other => {
            tracing::error!(error = %other, "request failed");
            internal(other.to_string())
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/sources ============

#[derive(Serialize)]
struct SourcesResponse {
    sources: Vec<SourceStatus>,
}

async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    Json(SourcesResponse {
        sources: source_statuses(&state.app.config, &state.app.credentials),
    })
}

// ============ POST /api/osint ============

async fn handle_osint(
    State(state): State<AppState>,
    Json(request): Json<InvestigateRequest>,
) -> Result<Json<InvestigateResponse>, AppError> {
    state
        .app
        .investigator
        .investigate(request)
        .await
        .map(Json)
        .map_err(|e| match e.downcast::<osint_harness_core::Error>() {
            Ok(core) => core_error(&state, core),
            Err(other) => bad_request(other.to_string()),
        })
}

// ============ /api/similar-cases ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimilarCasesRequest {
    #[serde(default)]
    case_id: String,
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimilarCasesResponse {
    similar_cases: Vec<SimilarityMatch>,
}

async fn handle_similar_cases(
    State(state): State<AppState>,
    Json(request): Json<SimilarCasesRequest>,
) -> Result<Json<SimilarCasesResponse>, AppError> {
    if request.case_id.trim().is_empty() {
        return Err(bad_request("Case ID is required"));
    }
    let similar_cases = state
        .app
        .cases
        .similar_cases(&request.case_id, request.max_results)
        .await
        .map_err(|e| core_error(&state, e))?;
    Ok(Json(SimilarCasesResponse { similar_cases }))
}

#[derive(Deserialize)]
struct SemanticSearchParams {
    #[serde(default)]
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SemanticSearchResponse {
    results: Vec<SimilarityMatch>,
}

async fn handle_semantic_search(
    State(state): State<AppState>,
    Query(params): Query<SemanticSearchParams>,
) -> Result<Json<SemanticSearchResponse>, AppError> {
    if params.query.trim().is_empty() {
        return Err(bad_request("Query parameter is required"));
    }
    let results = state
        .app
        .cases
        .semantic_search(&params.query, params.limit)
        .await
        .map_err(|e| core_error(&state, e))?;
    Ok(Json(SemanticSearchResponse { results }))
}

// ============ /api/cases ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCasesParams {
    risk_level: Option<RiskLevel>,
    query_type: Option<QueryType>,
    user_id: Option<String>,
    limit: Option<usize>,
}

async fn handle_list_cases(
    State(state): State<AppState>,
    Query(params): Query<ListCasesParams>,
) -> Result<Json<Value>, AppError> {
    let filter = CaseFilter {
        risk_level: params.risk_level,
        query_type: params.query_type,
        user_id: params.user_id,
        limit: params.limit,
    };
    let cases = state
        .app
        .cases
        .list_cases(&filter)
        .await
        .map_err(|e| core_error(&state, e))?;
    Ok(Json(json!({ "cases": cases })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCaseRequest {
    #[serde(default)]
    query: String,
    query_type: QueryType,
    #[serde(default)]
    results: Value,
    ai_analysis: RiskAnalysis,
    #[serde(default)]
    user_id: Option<String>,
}

async fn handle_create_case(
    State(state): State<AppState>,
    Json(request): Json<CreateCaseRequest>,
) -> Result<Json<Value>, AppError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("Missing required fields"));
    }
    let analysis = serde_json::to_value(&request.ai_analysis)
        .map_err(|e| internal(e.to_string()))?;
    let new = NewCase {
        title: Some(case_title(&request.query, request.query_type)),
        query: request.query,
        query_type: request.query_type,
        date: Some(today()),
        risk_level: request.ai_analysis.risk_level,
        summary: request.ai_analysis.summary,
        notes: None,
        tags: Vec::new(),
        results: request.results,
        analysis,
        user_id: Some(
            request
                .user_id
                .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
        ),
    };
    let case = state
        .app
        .cases
        .create_case(new)
        .await
        .map_err(|e| core_error(&state, e))?;
    Ok(Json(json!({ "success": true, "case": case })))
}

#[derive(Deserialize)]
struct DeleteCaseParams {
    #[serde(default)]
    id: String,
}

async fn handle_delete_case(
    State(state): State<AppState>,
    Query(params): Query<DeleteCaseParams>,
) -> Result<Json<Value>, AppError> {
    if params.id.trim().is_empty() {
        return Err(bad_request("Case ID is required"));
    }
    let existed = state
        .app
        .cases
        .delete_case(&params.id)
        .await
        .map_err(|e| core_error(&state, e))?;
    if !existed {
        return Err(not_found(format!("case not found: {}", params.id)));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Case deleted successfully",
    })))
}

async fn handle_get_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Case>, AppError> {
    state
        .app
        .cases
        .get_case(&id)
        .await
        .map_err(|e| core_error(&state, e))?
        .map(Json)
        .ok_or_else(|| not_found(format!("case not found: {}", id)))
}

async fn handle_update_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CaseUpdate>,
) -> Result<Json<Case>, AppError> {
    state
        .app
        .cases
        .update_case(&id, update)
        .await
        .map(Json)
        .map_err(|e| core_error(&state, e))
}
