use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use scout_research::{ImportError, ImportMode, ImportSummary};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ErrorCode};

#[derive(Debug, Deserialize)]
pub(super) struct ImportQuery {
    pub mode: Option<ImportMode>,
}

/// Imports a CSV body into the local catalog. `?mode=merge` keeps existing
/// rows; the default replaces them.
pub(super) async fn import(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ApiResponse<ImportSummary>>, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::validation(req_id.0, "request body must contain CSV data"));
    }

    let mut options = state.import_options;
    options.mode = query.mode.unwrap_or_default();

    let summary = scout_research::import_batch(state.catalog.as_ref(), &body, &options)
        .await
        .map_err(|e| map_import_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(summary, req_id.0)))
}

fn map_import_error(request_id: String, error: &ImportError) -> ApiError {
    match error {
        ImportError::TooManyErrors { .. } => {
            ApiError::new(request_id, ErrorCode::BadRequest, error.to_string())
        }
        ImportError::Clear(_) | ImportError::Batch { .. } => {
            tracing::error!(%request_id, error = %error, "catalog import failed");
            ApiError::new(request_id, ErrorCode::InternalError, error.to_string())
        }
    }
}
