use anyhow::Result;
use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{
    export, health, import, projects, templates, tier_fields, tier_values, tiers,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

pub async fn create_app(db: DatabaseConnection, cors_origin: Option<&str>) -> Result<Router> {
    let state = AppState { db };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Project routes
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/:id", get(projects::get_project))
        .route("/projects/:id", put(projects::update_project))
        .route("/projects/:id", delete(projects::delete_project))
        .route("/projects/:id/duplicate", post(projects::duplicate_project))
        // Tier tree routes
        .route("/projects/:id/tiers", get(tiers::list_tiers))
        .route("/projects/:id/tiers", post(tiers::create_tier))
        .route("/tiers/:id", patch(tiers::update_tier))
        .route("/tiers/:id", delete(tiers::delete_tier))
        .route("/tiers/:id/duplicate", post(tiers::duplicate_tier))
        .route("/tiers/:id/reorder", post(tiers::reorder_tier))
        .route("/tiers/:id/aggregate", get(tiers::aggregate_tier))
        // Value routes
        .route("/tiers/:id/values", get(tier_values::read_values))
        .route("/tiers/:id/values", put(tier_values::write_values))
        // Field catalog routes
        .route("/tiers/:id/fields", get(tier_fields::list_fields))
        .route("/tiers/:id/fields", post(tier_fields::add_field))
        .route(
            "/tiers/:id/fields/:field_id",
            delete(tier_fields::delete_field),
        )
        .route(
            "/tiers/:id/fields/import/:template_id",
            post(templates::import_template),
        )
        // Template routes
        .route("/templates", get(templates::list_templates))
        .route("/templates", post(templates::create_template))
        .route("/templates/:id", delete(templates::delete_template))
        .route("/templates/:id/fields", get(templates::list_template_fields))
        .route("/templates/:id/fields", post(templates::add_template_field))
        .route(
            "/templates/:id/fields/:field_id",
            delete(templates::remove_template_field),
        )
        // Export and bulk import
        .route("/tiers/:id/export/xlsx", get(export::export_xlsx))
        .route("/projects/:id/import/values", post(import::import_values))
}
