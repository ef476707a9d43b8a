mod catalog;
mod research;
mod search;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use scout_research::{CatalogSink, ImportOptions, Researcher};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<dyn CatalogSink>,
    pub researcher: Arc<Researcher>,
    /// Batch size and error budget for uploads; the mode comes per request.
    pub import_options: ImportOptions,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseMeta {
    fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

/// Machine-readable error code. Each code owns exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    BadRequest,
    NothingResolved,
    RateLimited,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::ValidationError | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NothingResolved => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(request_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn validation(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(request_id, ErrorCode::ValidationError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.error.code.status(), Json(self)).into_response()
    }
}

/// Result size for search endpoints: default 20, bounded to `1..=100`.
pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(20).clamp(1, 100)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

/// Routes that may reach the billed marketplace API.
fn metered_routes(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/search", get(search::search))
        .route("/api/v1/research", post(research::research))
        .route_layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/catalog/import", post(catalog::import))
        .merge(metered_routes(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog_products: Option<i64>,
}

/// Liveness plus the size of the local catalog. An unreachable database
/// degrades the service to 503.
async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let checked = match scout_db::health_check(&state.pool).await {
        Ok(()) => scout_db::count_catalog(&state.pool).await,
        Err(e) => Err(e),
    };

    let (status, health) = match checked {
        Ok(count) => (
            StatusCode::OK,
            Health {
                status: "ok",
                database: "ok",
                catalog_products: Some(count),
            },
        ),
        Err(e) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Health {
                    status: "degraded",
                    database: "unavailable",
                    catalog_products: None,
                },
            )
        }
    };

    (status, Json(ApiResponse::new(health, req_id.0)))
}

/// 60 metered requests per minute, shared across all clients.
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(60, Duration::from_secs(60))
}
