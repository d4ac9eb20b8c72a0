use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::info;

use crate::database::entities::{projects, tiers, users};
use crate::errors::{TierError, TierResult};
use crate::services::{TierService, ValidationService};

/// Project CRUD plus whole-project duplication. A project owns its root
/// tiers; deleting one cascades to every tier, field and value beneath it.
#[derive(Clone)]
pub struct ProjectService {
    db: DatabaseConnection,
    tier_service: TierService,
}

impl ProjectService {
    pub fn new(db: DatabaseConnection) -> Self {
        let tier_service = TierService::new(db.clone());
        Self { db, tier_service }
    }

    pub async fn list_projects(&self) -> TierResult<Vec<projects::Model>> {
        Ok(projects::Entity::find()
            .order_by_desc(projects::Column::UpdatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn get_project(&self, project_id: i32) -> TierResult<projects::Model> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Project", project_id))
    }

    pub async fn create_project(
        &self,
        actor: &users::Model,
        name: &str,
    ) -> TierResult<projects::Model> {
        let name = ValidationService::validate_project_name(name)
            .map_err(|e| TierError::Validation(e.to_string()))?;

        let now = Utc::now();
        let project = projects::ActiveModel {
            name: Set(name.clone()),
            created_by: Set(actor.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let project = project.insert(&self.db).await?;
        info!("Created project '{}' (id {})", name, project.id);

        Ok(project)
    }

    pub async fn update_project(
        &self,
        project_id: i32,
        name: &str,
    ) -> TierResult<projects::Model> {
        let name = ValidationService::validate_project_name(name)
            .map_err(|e| TierError::Validation(e.to_string()))?;

        let project = self.get_project(project_id).await?;
        let mut active: projects::ActiveModel = project.into();
        active.name = Set(name);
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete_project(&self, project_id: i32) -> TierResult<()> {
        let result = projects::Entity::delete_by_id(project_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(TierError::not_found("Project", project_id));
        }

        info!("Deleted project {}", project_id);
        Ok(())
    }

    /// Deep-clone a whole project: a fresh project row plus a clone of every
    /// root tier's subtree, all in one transaction.
    pub async fn duplicate_project(
        &self,
        actor: &users::Model,
        project_id: i32,
    ) -> TierResult<projects::Model> {
        let source = self.get_project(project_id).await?;

        let roots = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(project_id))
            .filter(tiers::Column::ParentId.is_null())
            .order_by_asc(tiers::Column::DisplayOrder)
            .all(&self.db)
            .await?;

        let txn = self.db.begin().await?;

        let now = Utc::now();
        let clone = projects::ActiveModel {
            name: Set(format!("{} (copy)", source.name)),
            created_by: Set(actor.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let clone = clone.insert(&txn).await?;

        for root in &roots {
            self.tier_service
                .clone_subtree(&txn, root, clone.id, None, root.display_order)
                .await?;
        }

        txn.commit().await?;
        info!("Duplicated project {} as {}", project_id, clone.id);

        Ok(clone)
    }
}
