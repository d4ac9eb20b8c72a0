use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::info;

use crate::database::entities::{field_templates, template_fields, tier_fields, tiers, FieldType};
use crate::errors::{TierError, TierResult};
use crate::services::ValidationService;

/// Field templates: project-independent, reusable bundles of field
/// definitions that can be copied onto a tier.
#[derive(Clone)]
pub struct TemplateService {
    db: DatabaseConnection,
}

impl TemplateService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_templates(&self) -> TierResult<Vec<field_templates::Model>> {
        Ok(field_templates::Entity::find()
            .order_by_asc(field_templates::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn create_template(&self, name: &str) -> TierResult<field_templates::Model> {
        let name = ValidationService::validate_project_name(name)
            .map_err(|e| TierError::Validation(e.to_string()))?;

        let template = field_templates::ActiveModel {
            name: Set(name),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(template.insert(&self.db).await?)
    }

    pub async fn delete_template(&self, template_id: i32) -> TierResult<()> {
        let result = field_templates::Entity::delete_by_id(template_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TierError::not_found("Template", template_id));
        }
        Ok(())
    }

    pub async fn list_template_fields(
        &self,
        template_id: i32,
    ) -> TierResult<Vec<template_fields::Model>> {
        self.require_template(template_id).await?;

        Ok(template_fields::Entity::find()
            .filter(template_fields::Column::TemplateId.eq(template_id))
            .order_by_asc(template_fields::Column::DisplayOrder)
            .all(&self.db)
            .await?)
    }

    pub async fn add_template_field(
        &self,
        template_id: i32,
        name: &str,
        field_type: &str,
        options: Option<&str>,
    ) -> TierResult<template_fields::Model> {
        self.require_template(template_id).await?;

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

        let existing = template_fields::Entity::find()
            .filter(template_fields::Column::TemplateId.eq(template_id))
            .all(&self.db)
            .await?;
        let display_order = existing
            .iter()
            .map(|f| f.display_order + 1)
            .max()
            .unwrap_or(0);

        let field = template_fields::ActiveModel {
            template_id: Set(template_id),
            field_name: Set(name),
            field_type: Set(field_type.as_str().to_string()),
            options: Set(options),
            display_order: Set(display_order),
            ..Default::default()
        };

        Ok(field.insert(&self.db).await?)
    }

    pub async fn remove_template_field(
        &self,
        template_id: i32,
        field_id: i32,
    ) -> TierResult<()> {
        let field = template_fields::Entity::find_by_id(field_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Template field", field_id))?;

        if field.template_id != template_id {
            return Err(TierError::not_found("Template field", field_id));
        }

        template_fields::Entity::delete_by_id(field_id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Copy a template's fields onto a tier, appended after any existing
    /// fields and preserving the template-internal order.
    pub async fn import_into_tier(
        &self,
        template_id: i32,
        tier_id: i32,
    ) -> TierResult<Vec<tier_fields::Model>> {
        self.require_template(template_id).await?;
        tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))?;

        let template_fields = template_fields::Entity::find()
            .filter(template_fields::Column::TemplateId.eq(template_id))
            .order_by_asc(template_fields::Column::DisplayOrder)
            .all(&self.db)
            .await?;

        let base = tier_fields::Entity::find()
            .filter(tier_fields::Column::TierId.eq(tier_id))
            .count(&self.db)
            .await? as i32;

        let txn = self.db.begin().await?;
        let mut created = Vec::with_capacity(template_fields.len());
        for (offset, field) in template_fields.iter().enumerate() {
            let clone = tier_fields::ActiveModel {
                tier_id: Set(tier_id),
                field_name: Set(field.field_name.clone()),
                field_type: Set(field.field_type.clone()),
                options: Set(field.options.clone()),
                display_order: Set(base + offset as i32),
                ..Default::default()
            };
            created.push(clone.insert(&txn).await?);
        }
        txn.commit().await?;

        info!(
            "Imported {} field(s) from template {} into tier {}",
            created.len(),
            template_id,
            tier_id
        );
        Ok(created)
    }

    async fn require_template(&self, template_id: i32) -> TierResult<field_templates::Model> {
        field_templates::Entity::find_by_id(template_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Template", template_id))
    }
}
