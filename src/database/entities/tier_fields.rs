use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::FieldType;

/// A typed data slot scoped to a single tier. Fields are independent per
/// tier; there is no inheritance from parent or child tiers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tier_fields")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tier_id: i32,
    pub field_name: String,
    pub field_type: String,
    /// Newline-delimited choices, dropdown fields only.
    pub options: Option<String>,
    pub display_order: i32,
}

impl Model {
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::parse(&self.field_type)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tiers::Entity",
        from = "Column::TierId",
        to = "super::tiers::Column::Id",
        on_delete = "Cascade"
    )]
    Tier,
    #[sea_orm(has_many = "super::tier_data::Entity")]
    TierData,
}

impl Related<super::tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tier.def()
    }
}

impl Related<super::tier_data::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TierData.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
