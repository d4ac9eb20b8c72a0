use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

use crate::database::entities::{tier_data, tier_fields, tiers};
use crate::errors::{TierError, TierResult};
use crate::services::ValidationService;

/// One incoming value for a (tier, field) pair. Exactly one of `value` and
/// `text_value` is consulted, chosen by the field's type.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct ValueWrite {
    pub field_id: i32,
    pub value: Option<f64>,
    pub text_value: Option<String>,
}

/// The tier value store: per-(tier, field) scalars with upsert semantics.
/// Only leaf tiers are writable; parent tiers are computed by aggregation.
#[derive(Clone)]
pub struct ValueService {
    db: DatabaseConnection,
}

impl ValueService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn read_values(&self, tier_id: i32) -> TierResult<Vec<tier_data::Model>> {
        self.require_tier(tier_id).await?;

        Ok(tier_data::Entity::find()
            .filter(tier_data::Column::TierId.eq(tier_id))
            .all(&self.db)
            .await?)
    }

    pub async fn write_value(
        &self,
        tier_id: i32,
        write: &ValueWrite,
    ) -> TierResult<tier_data::Model> {
        Self::write_value_on(&self.db, tier_id, write).await
    }

    /// Apply a batch of writes in one transaction. The first invalid entry
    /// fails the whole batch and rolls back every earlier write.
    pub async fn write_values(
        &self,
        tier_id: i32,
        writes: &[ValueWrite],
    ) -> TierResult<Vec<tier_data::Model>> {
        let txn = self.db.begin().await?;

        let mut written = Vec::with_capacity(writes.len());
        for write in writes {
            written.push(Self::write_value_on(&txn, tier_id, write).await?);
        }

        txn.commit().await?;
        Ok(written)
    }

    /// Upsert a value on the (tier_id, field_id) unique key. The conflict
    /// update clause only touches the column the field's type routes to, so
    /// a numeric write never clobbers a text payload and vice versa.
    async fn write_value_on<C: ConnectionTrait>(
        conn: &C,
        tier_id: i32,
        write: &ValueWrite,
    ) -> TierResult<tier_data::Model> {
        tiers::Entity::find_by_id(tier_id)
            .one(conn)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))?;

        let children = tiers::Entity::find()
            .filter(tiers::Column::ParentId.eq(tier_id))
            .count(conn)
            .await?;
        if children > 0 {
            return Err(TierError::ParentTierReadOnly(tier_id));
        }

        let field = tier_fields::Entity::find_by_id(write.field_id)
            .one(conn)
            .await?
            .ok_or_else(|| TierError::not_found("Field", write.field_id))?;
        if field.tier_id != tier_id {
            return Err(TierError::not_found("Field", write.field_id));
        }

        let field_type = field.field_type().ok_or_else(|| {
            TierError::Validation(format!(
                "field '{}' has unknown type '{}'",
                field.field_name, field.field_type
            ))
        })?;

        let now = Utc::now();
        let (active, update_column) = if field_type.is_numeric() {
            let value = write.value.ok_or_else(|| {
                TierError::Validation(format!(
                    "field '{}' expects a numeric value",
                    field.field_name
                ))
            })?;
            (
                tier_data::ActiveModel {
                    tier_id: Set(tier_id),
                    field_id: Set(field.id),
                    value: Set(Some(value)),
                    text_value: Set(None),
                    updated_at: Set(now),
                    ..Default::default()
                },
                tier_data::Column::Value,
            )
        } else {
            let text = write.text_value.as_deref().ok_or_else(|| {
                TierError::Validation(format!(
                    "field '{}' expects a text value",
                    field.field_name
                ))
            })?;
            ValidationService::validate_text_value(field_type, text, field.options.as_deref())
                .map_err(|e| TierError::Validation(e.to_string()))?;
            (
                tier_data::ActiveModel {
                    tier_id: Set(tier_id),
                    field_id: Set(field.id),
                    value: Set(None),
                    text_value: Set(Some(text.to_string())),
                    updated_at: Set(now),
                    ..Default::default()
                },
                tier_data::Column::TextValue,
            )
        };

        tier_data::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([tier_data::Column::TierId, tier_data::Column::FieldId])
                    .update_columns([update_column, tier_data::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(conn)
            .await?;

        tier_data::Entity::find()
            .filter(tier_data::Column::TierId.eq(tier_id))
            .filter(tier_data::Column::FieldId.eq(field.id))
            .one(conn)
            .await?
            .ok_or_else(|| TierError::Conflict("upserted value row disappeared".to_string()))
    }

    async fn require_tier(&self, tier_id: i32) -> TierResult<tiers::Model> {
        tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))
    }
}
