//! Bulk value import tests
//!
//! The import never aborts as a whole; bad rows are reported and the rest
//! of the file is still processed.

use anyhow::Result;
use chrono::Utc;
use futures_util::StreamExt;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tempfile::NamedTempFile;

use tierdesk::database::entities::{projects, users};
use tierdesk::database::setup_database;
use tierdesk::services::{
    AggregationService, BulkImportProgress, FieldService, ImportService, TierService,
};

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

async fn setup_fixture(db: &DatabaseConnection) -> Result<(users::Model, projects::Model)> {
    let admin = users::ActiveModel {
        email: Set("admin@example.com".to_string()),
        display_name: Set(None),
        is_admin: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let now = Utc::now();
    let project = projects::ActiveModel {
        name: Set("Import".to_string()),
        created_by: Set(admin.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok((admin, project))
}

async fn collect_progress(
    service: &ImportService,
    project_id: i32,
    csv: &str,
) -> Vec<BulkImportProgress> {
    service
        .start_import(project_id, csv.to_string())
        .collect()
        .await
}

#[tokio::test]
async fn test_import_creates_and_updates_values() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let tiers = TierService::new(db.clone());
    let fields = FieldService::new(db.clone());
    let aggregation = AggregationService::new(db.clone());

    let leaf = tiers
        .create_tier(&admin, project.id, None, "Leaf", true)
        .await?;
    fields.add_field(leaf.id, "Score", "number", None).await?;

    let csv = format!(
        "tier_id,field_name,value\n{id},Score,5\n{id},Score,9\n",
        id = leaf.id
    );
    let events =
        collect_progress(&ImportService::new(db.clone()), project.id, &csv).await;

    let last = events.last().unwrap();
    assert_eq!(last.message, "Import complete");
    assert_eq!(last.total, 2);
    assert_eq!(last.created, 1);
    assert_eq!(last.updated, 1);
    assert!(last.errors.is_empty());

    let values = aggregation.aggregate_tier(leaf.id).await?;
    assert_eq!(values.get("Score"), Some(&9.0));

    Ok(())
}

#[tokio::test]
async fn test_import_continues_past_bad_rows() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let tiers = TierService::new(db.clone());
    let fields = FieldService::new(db.clone());
    let aggregation = AggregationService::new(db.clone());

    let leaf = tiers
        .create_tier(&admin, project.id, None, "Leaf", true)
        .await?;
    fields.add_field(leaf.id, "Score", "number", None).await?;

    // Unknown field, unknown tier, empty value, then one good row
    let csv = format!(
        "tier_id,field_name,value\n\
         {id},Nope,1\n\
         424242,Score,1\n\
         {id},Score,\n\
         {id},Score,3\n",
        id = leaf.id
    );
    let events =
        collect_progress(&ImportService::new(db.clone()), project.id, &csv).await;

    let last = events.last().unwrap();
    assert_eq!(last.total, 4);
    assert_eq!(last.created, 1);
    assert_eq!(last.skipped, 1);
    assert_eq!(last.errors.len(), 2);

    let values = aggregation.aggregate_tier(leaf.id).await?;
    assert_eq!(values.get("Score"), Some(&3.0));

    Ok(())
}

#[tokio::test]
async fn test_import_rejects_cross_project_tiers() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let tiers = TierService::new(db.clone());
    let fields = FieldService::new(db.clone());

    let now = Utc::now();
    let other_project = projects::ActiveModel {
        name: Set("Other".to_string()),
        created_by: Set(admin.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;
    let foreign = tiers
        .create_tier(&admin, other_project.id, None, "Foreign", true)
        .await?;
    fields.add_field(foreign.id, "Score", "number", None).await?;

    let csv = format!("tier_id,field_name,value\n{},Score,1\n", foreign.id);
    let events =
        collect_progress(&ImportService::new(db.clone()), project.id, &csv).await;

    let last = events.last().unwrap();
    assert_eq!(last.created, 0);
    assert_eq!(last.errors.len(), 1);
    assert!(last.errors[0].contains("different project"));

    Ok(())
}

#[tokio::test]
async fn test_import_reports_incremental_progress() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let tiers = TierService::new(db.clone());
    let fields = FieldService::new(db.clone());

    let leaf = tiers
        .create_tier(&admin, project.id, None, "Leaf", true)
        .await?;
    fields.add_field(leaf.id, "Score", "number", None).await?;

    let csv = format!(
        "tier_id,field_name,value\n{id},Score,1\n{id},Score,2\n{id},Score,3\n",
        id = leaf.id
    );
    let events =
        collect_progress(&ImportService::new(db.clone()), project.id, &csv).await;

    // One event per row plus the completion event
    assert_eq!(events.len(), 4);
    let currents: Vec<usize> = events.iter().map(|e| e.current).collect();
    assert_eq!(currents, vec![1, 2, 3, 3]);

    Ok(())
}
