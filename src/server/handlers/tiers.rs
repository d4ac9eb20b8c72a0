use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::entities::tiers;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::{AggregationService, ProjectService, TierService};

use super::{error_response, ApiError};

#[derive(Serialize, Deserialize)]
pub struct CreateTierRequest {
    pub name: String,
    pub parent_id: Option<i32>,
    pub allow_child_creation: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateTierRequest {
    pub name: Option<String>,
    pub allow_child_creation: Option<bool>,
}

/// Client contract for tier moves: `parentId` is the parent the client
/// currently believes the tier is under, `newParentId` an optional new home.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderTierRequest {
    pub new_index: usize,
    pub parent_id: Option<i32>,
    pub new_parent_id: Option<i32>,
}

pub async fn list_tiers(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(project_id): Path<i32>,
) -> Result<Json<Vec<tiers::Model>>, ApiError> {
    // Surface a 404 for missing projects instead of an empty list
    ProjectService::new(state.db.clone())
        .get_project(project_id)
        .await
        .map_err(error_response)?;

    let tiers = TierService::new(state.db.clone())
        .list_tiers(project_id)
        .await
        .map_err(error_response)?;

    Ok(Json(tiers))
}

pub async fn create_tier(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(project_id): Path<i32>,
    Json(payload): Json<CreateTierRequest>,
) -> Result<Json<tiers::Model>, ApiError> {
    ProjectService::new(state.db.clone())
        .get_project(project_id)
        .await
        .map_err(error_response)?;

    let tier = TierService::new(state.db.clone())
        .create_tier(
            &actor,
            project_id,
            payload.parent_id,
            &payload.name,
            payload.allow_child_creation.unwrap_or(true),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(tier))
}

pub async fn update_tier(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTierRequest>,
) -> Result<Json<tiers::Model>, ApiError> {
    let service = TierService::new(state.db.clone());

    let mut tier = service.get_tier(id).await.map_err(error_response)?;
    if let Some(name) = payload.name.as_deref() {
        tier = service.rename_tier(id, name).await.map_err(error_response)?;
    }
    if let Some(allow) = payload.allow_child_creation {
        tier = service
            .set_allow_child_creation(id, allow)
            .await
            .map_err(error_response)?;
    }

    Ok(Json(tier))
}

pub async fn delete_tier(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    TierService::new(state.db.clone())
        .delete_tier(id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true})))
}

pub async fn duplicate_tier(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<tiers::Model>, ApiError> {
    let clone = TierService::new(state.db.clone())
        .duplicate_tier(id)
        .await
        .map_err(error_response)?;

    Ok(Json(clone))
}

pub async fn reorder_tier(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<ReorderTierRequest>,
) -> Result<Json<Value>, ApiError> {
    TierService::new(state.db.clone())
        .reorder_tier(
            id,
            payload.new_index,
            payload.parent_id,
            payload.new_parent_id,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true})))
}

pub async fn aggregate_tier(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<BTreeMap<String, f64>>, ApiError> {
    let values = AggregationService::new(state.db.clone())
        .aggregate_tier(id)
        .await
        .map_err(error_response)?;

    Ok(Json(values))
}
