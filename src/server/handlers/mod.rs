pub mod export;
pub mod health;
pub mod import;
pub mod projects;
pub mod templates;
pub mod tier_fields;
pub mod tier_values;
pub mod tiers;

use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};

use crate::errors::TierError;

pub(crate) type ApiError = (StatusCode, Json<Value>);

/// Map a domain error onto an HTTP status with a JSON error body.
pub(crate) fn error_response(err: TierError) -> ApiError {
    let status = match &err {
        TierError::Unauthorized => StatusCode::UNAUTHORIZED,
        TierError::Forbidden(_) => StatusCode::FORBIDDEN,
        TierError::Validation(_) => StatusCode::BAD_REQUEST,
        TierError::NotFound { .. } => StatusCode::NOT_FOUND,
        TierError::ParentTierReadOnly(_) | TierError::Conflict(_) => StatusCode::CONFLICT,
        TierError::Export(_) | TierError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", err);
    }

    (status, Json(json!({"error": err.to_string()})))
}
