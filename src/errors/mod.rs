//! Domain error types for tierdesk.
//!
//! The tier tree, field catalog, value store and aggregation paths all share
//! one taxonomy so HTTP handlers can map failures uniformly.

pub mod tier;

pub use tier::TierError;

/// Result type alias for tier-tree and related operations
pub type TierResult<T> = Result<T, TierError>;
