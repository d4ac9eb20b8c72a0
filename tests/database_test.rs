//! Database functionality tests
//!
//! Migrations, entity operations and schema-level integrity.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use tempfile::NamedTempFile;

use tierdesk::database::entities::*;
use tierdesk::database::setup_database;

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    // Verify all tables exist by querying them
    assert_eq!(users::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(projects::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(tiers::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(tier_fields::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(tier_data::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(field_templates::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(template_fields::Entity::find().all(&db).await?.len(), 0);

    Ok(())
}

#[tokio::test]
async fn test_value_rows_are_unique_per_tier_and_field() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let now = Utc::now();
    let user = users::ActiveModel {
        email: Set("admin@example.com".to_string()),
        display_name: Set(None),
        is_admin: Set(true),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let project = projects::ActiveModel {
        name: Set("Schema".to_string()),
        created_by: Set(user.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let tier = tiers::ActiveModel {
        project_id: Set(project.id),
        parent_id: Set(None),
        name: Set("Leaf".to_string()),
        level: Set(0),
        display_order: Set(0),
        allow_child_creation: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let field = tier_fields::ActiveModel {
        tier_id: Set(tier.id),
        field_name: Set("Score".to_string()),
        field_type: Set("number".to_string()),
        options: Set(None),
        display_order: Set(0),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    tier_data::ActiveModel {
        tier_id: Set(tier.id),
        field_id: Set(field.id),
        value: Set(Some(5.0)),
        text_value: Set(None),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    // A second plain insert for the same (tier, field) pair must hit the
    // unique index; upserts rely on it
    let duplicate = tier_data::ActiveModel {
        tier_id: Set(tier.id),
        field_id: Set(field.id),
        value: Set(Some(9.0)),
        text_value: Set(None),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await;
    assert!(duplicate.is_err());

    Ok(())
}

#[tokio::test]
async fn test_migrations_roll_back_cleanly() -> Result<()> {
    use sea_orm_migration::MigratorTrait;
    use tierdesk::database::migrations::Migrator;

    let (db, _temp_file) = setup_test_db().await?;

    Migrator::down(&db, None).await?;
    Migrator::up(&db, None).await?;

    assert_eq!(tiers::Entity::find().all(&db).await?.len(), 0);

    Ok(())
}
