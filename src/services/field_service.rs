use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::info;

use crate::database::entities::{tier_data, tier_fields, tiers, FieldType};
use crate::errors::{TierError, TierResult};
use crate::services::ValidationService;

/// The field catalog: per-tier typed field definitions that leaf tiers are
/// edited against.
#[derive(Clone)]
pub struct FieldService {
    db: DatabaseConnection,
}

impl FieldService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_fields(&self, tier_id: i32) -> TierResult<Vec<tier_fields::Model>> {
        self.require_tier(tier_id).await?;

        Ok(tier_fields::Entity::find()
            .filter(tier_fields::Column::TierId.eq(tier_id))
            .order_by_asc(tier_fields::Column::DisplayOrder)
            .all(&self.db)
            .await?)
    }

    /// Add a field to a tier. Options are required for dropdown fields and
    /// ignored for every other type. New fields always go after the current
    /// maximum display_order; gaps left by deleted fields are never reused.
    pub async fn add_field(
        &self,
        tier_id: i32,
        name: &str,
        field_type: &str,
        options: Option<&str>,
    ) -> TierResult<tier_fields::Model> {
        self.require_tier(tier_id).await?;

        let name = ValidationService::validate_field_name(name)
            .map_err(|e| TierError::Validation(e.to_string()))?;

        let field_type = FieldType::parse(field_type).ok_or_else(|| {
            TierError::Validation(format!("unknown field type '{}'", field_type))
        })?;

        let options = if field_type.requires_options() {
            let raw = options.ok_or_else(|| {
                TierError::Validation("dropdown fields require an option list".to_string())
            })?;
            Some(
                ValidationService::normalize_dropdown_options(raw)
                    .map_err(|e| TierError::Validation(e.to_string()))?,
            )
        } else {
            None
        };

        let existing = tier_fields::Entity::find()
            .filter(tier_fields::Column::TierId.eq(tier_id))
            .all(&self.db)
            .await?;
        let display_order = existing
            .iter()
            .map(|f| f.display_order + 1)
            .max()
            .unwrap_or(0);

        let field = tier_fields::ActiveModel {
            tier_id: Set(tier_id),
            field_name: Set(name.clone()),
            field_type: Set(field_type.as_str().to_string()),
            options: Set(options),
            display_order: Set(display_order),
            ..Default::default()
        };

        let field = field.insert(&self.db).await?;
        info!("Added field '{}' to tier {}", name, tier_id);

        Ok(field)
    }

    /// Delete a field by id, scoped to its tier so a stale or cross-tier id
    /// cannot remove another tier's field. Stored values for the field go
    /// with it.
    pub async fn delete_field(&self, tier_id: i32, field_id: i32) -> TierResult<()> {
        let field = tier_fields::Entity::find_by_id(field_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Field", field_id))?;

        if field.tier_id != tier_id {
            return Err(TierError::not_found("Field", field_id));
        }

        let txn = self.db.begin().await?;
        tier_data::Entity::delete_many()
            .filter(tier_data::Column::FieldId.eq(field_id))
            .exec(&txn)
            .await?;
        tier_fields::Entity::delete_by_id(field_id).exec(&txn).await?;
        txn.commit().await?;

        Ok(())
    }

    async fn require_tier(&self, tier_id: i32) -> TierResult<tiers::Model> {
        tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))
    }
}
