use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::entities::{field_templates, template_fields, tier_fields};
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::TemplateService;

use super::{error_response, ApiError};

#[derive(Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
}

#[derive(Serialize, Deserialize)]
pub struct CreateTemplateFieldRequest {
    pub name: String,
    pub field_type: String,
    pub options: Option<String>,
}

pub async fn list_templates(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
) -> Result<Json<Vec<field_templates::Model>>, ApiError> {
    let templates = TemplateService::new(state.db.clone())
        .list_templates()
        .await
        .map_err(error_response)?;

    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<Json<field_templates::Model>, ApiError> {
    let template = TemplateService::new(state.db.clone())
        .create_template(&payload.name)
        .await
        .map_err(error_response)?;

    Ok(Json(template))
}

pub async fn delete_template(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    TemplateService::new(state.db.clone())
        .delete_template(id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true})))
}

pub async fn list_template_fields(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(template_id): Path<i32>,
) -> Result<Json<Vec<template_fields::Model>>, ApiError> {
    let fields = TemplateService::new(state.db.clone())
        .list_template_fields(template_id)
        .await
        .map_err(error_response)?;

    Ok(Json(fields))
}

pub async fn add_template_field(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(template_id): Path<i32>,
    Json(payload): Json<CreateTemplateFieldRequest>,
) -> Result<Json<template_fields::Model>, ApiError> {
    let field = TemplateService::new(state.db.clone())
        .add_template_field(
            template_id,
            &payload.name,
            &payload.field_type,
            payload.options.as_deref(),
        )
        .await
        .map_err(error_response)?;

    Ok(Json(field))
}

pub async fn remove_template_field(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path((template_id, field_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, ApiError> {
    TemplateService::new(state.db.clone())
        .remove_template_field(template_id, field_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({"success": true})))
}

pub async fn import_template(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path((tier_id, template_id)): Path<(i32, i32)>,
) -> Result<Json<Vec<tier_fields::Model>>, ApiError> {
    let created = TemplateService::new(state.db.clone())
        .import_into_tier(template_id, tier_id)
        .await
        .map_err(error_response)?;

    Ok(Json(created))
}
