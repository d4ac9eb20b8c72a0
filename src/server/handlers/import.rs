use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use tokio_stream::StreamExt;

use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::{ImportService, ProjectService};

use super::{error_response, ApiError};

/// Bulk value import. The CSV body is consumed whole, then progress streams
/// back over SSE one event per processed row.
pub async fn import_values(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(project_id): Path<i32>,
    body: String,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError> {
    ProjectService::new(state.db.clone())
        .get_project(project_id)
        .await
        .map_err(error_response)?;

    let progress = ImportService::new(state.db.clone()).start_import(project_id, body);

    let stream = progress.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
