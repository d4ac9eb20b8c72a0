use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A node in a project's hierarchy. `parent_id = None` marks a root tier.
/// A tier with children is a parent tier: its field values are computed by
/// aggregation and never written directly.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tiers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub project_id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
    /// Depth in the tree, 0 for roots. Kept consistent on reparent by the
    /// reorder operation.
    pub level: i32,
    /// Dense zero-based rank among siblings.
    pub display_order: i32,
    /// Gate for non-admin users adding children under this tier.
    pub allow_child_creation: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::projects::Entity",
        from = "Column::ProjectId",
        to = "super::projects::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,
    #[sea_orm(has_many = "super::tier_fields::Entity")]
    TierFields,
    #[sea_orm(has_many = "super::tier_data::Entity")]
    TierData,
}

impl Related<super::projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::tier_fields::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TierFields.def()
    }
}

impl Related<super::tier_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TierData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
