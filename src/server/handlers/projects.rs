use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::entities::projects;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::ProjectService;

use super::{error_response, ApiError};

#[derive(Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: String,
}

pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
) -> Result<Json<Vec<projects::Model>>, ApiError> {
    let projects = ProjectService::new(state.db.clone())
        .list_projects()
        .await
        .map_err(error_response)?;

    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<projects::Model>, ApiError> {
    let project = ProjectService::new(state.db.clone())
        .create_project(&actor, &payload.name)
        .await
        .map_err(error_response)?;

    Ok(Json(project))
}

pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<projects::Model>, ApiError> {
    let project = ProjectService::new(state.db.clone())
        .get_project(id)
        .await
        .map_err(error_response)?;

    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<projects::Model>, ApiError> {
    let project = ProjectService::new(state.db.clone())
        .update_project(id, &payload.name)
        .await
        .map_err(error_response)?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    ProjectService::new(state.db.clone())
        .delete_project(id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true})))
}

pub async fn duplicate_project(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<projects::Model>, ApiError> {
    let clone = ProjectService::new(state.db.clone())
        .duplicate_project(&actor, id)
        .await
        .map_err(error_response)?;

    Ok(Json(clone))
}
