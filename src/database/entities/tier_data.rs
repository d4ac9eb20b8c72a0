use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored value for one (tier, field) pair. Exactly one of `value` and
/// `text_value` is meaningful, chosen by the field's type. Writes upsert on
/// the (tier_id, field_id) unique key.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tier_data")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tier_id: i32,
    pub field_id: i32,
    pub value: Option<f64>,
    pub text_value: Option<String>,
    pub updated_at: ChronoDateTimeUtc,
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
    #[sea_orm(
        belongs_to = "super::tier_fields::Entity",
        from = "Column::FieldId",
        to = "super::tier_fields::Column::Id",
        on_delete = "Cascade"
    )]
    Field,
}

impl Related<super::tiers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tier.def()
    }
}

impl Related<super::tier_fields::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Field.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
