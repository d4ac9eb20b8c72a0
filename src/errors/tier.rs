use thiserror::Error;

/// Errors raised by tier, field, value, aggregation and template operations.
///
/// Validation and permission failures are detected before any write;
/// multi-step structural mutations run inside a transaction, so a failure
/// never leaves display_order or parent_id partially updated.
#[derive(Error, Debug)]
pub enum TierError {
    /// No authenticated actor on the request
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated but not allowed, e.g. child creation blocked by the
    /// parent's allow_child_creation gate
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Missing or malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Entity lookup by id failed
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// Values on a tier with children are computed by aggregation and never
    /// written directly
    #[error("Tier {0} has children; its values are computed by aggregation")]
    ParentTierReadOnly(i32),

    /// Tree state disagrees with the request, e.g. a reorder naming a parent
    /// the tier does not belong to
    #[error("Conflicting tree state: {0}")]
    Conflict(String),

    /// Spreadsheet generation failed
    #[error("Export failed: {0}")]
    Export(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl TierError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        TierError::NotFound { entity, id }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TierError::Database(_))
    }
}
