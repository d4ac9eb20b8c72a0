use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A reusable, project-independent bundle of field definitions that can be
/// imported (copied) into a tier's field set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "field_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::template_fields::Entity")]
    TemplateFields,
}

impl Related<super::template_fields::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TemplateFields.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
