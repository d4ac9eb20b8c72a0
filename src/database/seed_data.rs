use anyhow::Result;
use chrono::Utc;
use sea_orm::*;
use tracing::info;

use crate::database::entities::users;

/// Create the default administrator account on a fresh database so the
/// service is usable before any user management tooling runs against it.
pub async fn create_default_admin(db: &DatabaseConnection) -> Result<()> {
    let existing = users::Entity::find()
        .filter(users::Column::Email.eq("admin@tierdesk.local"))
        .one(db)
        .await?;

    if existing.is_some() {
        info!("Default admin already exists, skipping seed data creation");
        return Ok(());
    }

    let admin = users::ActiveModel {
        email: Set("admin@tierdesk.local".to_string()),
        display_name: Set(Some("Administrator".to_string())),
        is_admin: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let result = users::Entity::insert(admin).exec(db).await?;
    info!("Created default admin user with ID: {}", result.last_insert_id);

    Ok(())
}
