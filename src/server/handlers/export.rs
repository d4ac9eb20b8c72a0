use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::services::ExportService;

use super::{error_response, ApiError};

/// Export a tier's subtree as a spreadsheet download. Parent sheets carry
/// live SUM formulas over their child sheets, so the workbook recalculates
/// after hand edits.
pub async fn export_xlsx(
    State(state): State<AppState>,
    CurrentUser(_actor): CurrentUser,
    Path(tier_id): Path<i32>,
) -> Result<Response, ApiError> {
    let bytes = ExportService::new(state.db.clone())
        .export_subtree_xlsx(tier_id)
        .await
        .map_err(error_response)?;

    let filename = format!("tier-{}-export.xlsx", tier_id);
    let response = (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response();

    Ok(response)
}
