use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use scout_research::SearchResponse;

use crate::middleware::RequestId;

use super::{normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// Hybrid search: a marketplace URL is looked up directly, anything else
/// goes through the catalog first and the marketplace second.
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::validation(req_id.0, "query parameter q is required"));
    }

    let response = state
        .researcher
        .search_unified(q, normalize_limit(query.limit))
        .await;
    if !response.errors.is_empty() {
        tracing::warn!(request_id = %req_id.0, errors = ?response.errors, "search sources failed");
    }

    Ok(Json(ApiResponse::new(response, req_id.0)))
}
