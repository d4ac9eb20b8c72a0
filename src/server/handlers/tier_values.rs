use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::database::entities::tier_data;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::{ValueService, ValueWrite};

use super::{error_response, ApiError};

pub async fn read_values(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(tier_id): Path<i32>,
) -> Result<Json<Vec<tier_data::Model>>, ApiError> {
    let values = ValueService::new(state.db.clone())
        .read_values(tier_id)
        .await
        .map_err(error_response)?;

    Ok(Json(values))
}

/// Write a batch of values to a leaf tier. The batch is transactional: one
/// invalid entry fails the whole request and nothing is stored.
pub async fn write_values(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(tier_id): Path<i32>,
    Json(payload): Json<Vec<ValueWrite>>,
) -> Result<Json<Vec<tier_data::Model>>, ApiError> {
    let written = ValueService::new(state.db.clone())
        .write_values(tier_id, &payload)
        .await
        .map_err(error_response)?;

    Ok(Json(written))
}
