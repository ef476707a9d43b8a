use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use scout_research::{ResearchError, ResearchReport, ResearchRequest};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ErrorCode};

pub(super) async fn research(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ResearchReport>>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::validation(req_id.0.clone(), e.body_text()))?;

    if request.inputs.is_empty() {
        return Err(ApiError::validation(req_id.0, "at least one url or asin is required"));
    }
    if let (Some(min), Some(max)) = (request.min_price, request.max_price) {
        if min > max {
            return Err(ApiError::validation(req_id.0, "min_price must not exceed max_price"));
        }
    }

    match state.researcher.research_products(&request).await {
        Ok(report) => Ok(Json(ApiResponse::new(report, req_id.0))),
        Err(e @ ResearchError::NothingResolved { .. }) => {
            tracing::warn!(request_id = %req_id.0, error = %e, "research resolved nothing");
            Err(ApiError::new(req_id.0, ErrorCode::NothingResolved, e.to_string()))
        }
    }
}
