use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::entities::tier_fields;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::FieldService;

use super::{error_response, ApiError};

#[derive(Serialize, Deserialize)]
pub struct CreateFieldRequest {
    pub name: String,
    pub field_type: String,
    pub options: Option<String>,
}

pub async fn list_fields(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(tier_id): Path<i32>,
) -> Result<Json<Vec<tier_fields::Model>>, ApiError> {
    let fields = FieldService::new(state.db.clone())
        .list_fields(tier_id)
        .await
        .map_err(error_response)?;

    Ok(Json(fields))
}

pub async fn add_field(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(tier_id): Path<i32>,
    Json(payload): Json<CreateFieldRequest>,
) -> Result<Json<tier_fields::Model>, ApiError> {
    let field = FieldService::new(state.db.clone())
        .add_field(
            tier_id,
            &payload.name,
            &payload.field_type,
            payload.options.as_deref(),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(field))
}

pub async fn delete_field(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path((tier_id, field_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, ApiError> {
    FieldService::new(state.db.clone())
        .delete_field(tier_id, field_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true})))
}
