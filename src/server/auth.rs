use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json,
};
use sea_orm::EntityTrait;
use serde_json::{json, Value};

use crate::database::entities::users;
use crate::server::app::AppState;

/// The authenticated actor on a request, resolved from the `x-user-id`
/// header against the users table. Authentication itself (sessions, tokens)
/// is handled upstream; this only trusts the id the gateway forwards.
pub struct CurrentUser(pub users::Model);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i32>().ok())
            .ok_or_else(unauthorized)?;

        let user = users::Entity::find_by_id(user_id)
            .one(&state.db)
            .await
            .map_err(|err| {
                tracing::error!("User lookup failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Database error"})),
                )
            })?
            .ok_or_else(unauthorized)?;

        Ok(CurrentUser(user))
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Authentication required"})),
    )
}
