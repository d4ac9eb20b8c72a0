//! Subtree and project duplication tests

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use tempfile::NamedTempFile;

use tierdesk::database::entities::{projects, tier_fields, tiers, users};
use tierdesk::database::setup_database;
use tierdesk::services::{
    AggregationService, FieldService, ProjectService, TierService, ValueService, ValueWrite,
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
        name: Set("Source".to_string()),
        created_by: Set(admin.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok((admin, project))
}

/// Department -> {Team A (Score=5), Team B (Score=7)}
async fn build_sample_tree(
    db: &DatabaseConnection,
    admin: &users::Model,
    project_id: i32,
) -> Result<tiers::Model> {
    let tier_service = TierService::new(db.clone());
    let field_service = FieldService::new(db.clone());
    let value_service = ValueService::new(db.clone());

    let dept = tier_service
        .create_tier(admin, project_id, None, "Department", true)
        .await?;
    let team_a = tier_service
        .create_tier(admin, project_id, Some(dept.id), "Team A", true)
        .await?;
    let team_b = tier_service
        .create_tier(admin, project_id, Some(dept.id), "Team B", true)
        .await?;

    for (tier, score) in [(&team_a, 5.0), (&team_b, 7.0)] {
        let field = field_service
            .add_field(tier.id, "Score", "number", None)
            .await?;
        value_service
            .write_value(
                tier.id,
                &ValueWrite {
                    field_id: field.id,
                    value: Some(score),
                    text_value: None,
                },
            )
            .await?;
    }

    Ok(dept)
}

#[tokio::test]
async fn test_duplicate_tier_clones_whole_subtree() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let tier_service = TierService::new(db.clone());
    let aggregation = AggregationService::new(db.clone());

    let dept = build_sample_tree(&db, &admin, project.id).await?;

    let clone = tier_service.duplicate_tier(dept.id).await?;

    assert_ne!(clone.id, dept.id);
    assert_eq!(clone.name, dept.name);
    assert_eq!(clone.parent_id, None);
    // Appended after the original among the roots
    assert_eq!(clone.display_order, 1);

    let cloned_children = tiers::Entity::find()
        .filter(tiers::Column::ParentId.eq(clone.id))
        .all(&db)
        .await?;
    assert_eq!(cloned_children.len(), 2);

    // Cloned fields have fresh ids
    let original_field_ids: Vec<i32> = tier_fields::Entity::find()
        .all(&db)
        .await?
        .iter()
        .map(|f| f.id)
        .collect();
    assert_eq!(original_field_ids.len(), 4);

    // Values came along: the clone aggregates the same total
    let clone_values = aggregation.aggregate_tier(clone.id).await?;
    assert_eq!(clone_values.get("Score"), Some(&12.0));

    // And the original is untouched
    let original_values = aggregation.aggregate_tier(dept.id).await?;
    assert_eq!(original_values.get("Score"), Some(&12.0));

    Ok(())
}

#[tokio::test]
async fn test_clone_edits_do_not_leak_into_original() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let tier_service = TierService::new(db.clone());
    let value_service = ValueService::new(db.clone());
    let aggregation = AggregationService::new(db.clone());

    let dept = build_sample_tree(&db, &admin, project.id).await?;
    let clone = tier_service.duplicate_tier(dept.id).await?;

    // Bump Team A's score inside the clone
    let cloned_children = tiers::Entity::find()
        .filter(tiers::Column::ParentId.eq(clone.id))
        .all(&db)
        .await?;
    let cloned_team_a = cloned_children
        .iter()
        .find(|t| t.name == "Team A")
        .unwrap();
    let field = tier_fields::Entity::find()
        .filter(tier_fields::Column::TierId.eq(cloned_team_a.id))
        .one(&db)
        .await?
        .unwrap();
    value_service
        .write_value(
            cloned_team_a.id,
            &ValueWrite {
                field_id: field.id,
                value: Some(100.0),
                text_value: None,
            },
        )
        .await?;

    let clone_values = aggregation.aggregate_tier(clone.id).await?;
    assert_eq!(clone_values.get("Score"), Some(&107.0));

    let original_values = aggregation.aggregate_tier(dept.id).await?;
    assert_eq!(original_values.get("Score"), Some(&12.0));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_project_copies_every_root_subtree() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (admin, project) = setup_fixture(&db).await?;
    let project_service = ProjectService::new(db.clone());
    let aggregation = AggregationService::new(db.clone());

    build_sample_tree(&db, &admin, project.id).await?;

    let clone = project_service.duplicate_project(&admin, project.id).await?;

    assert_ne!(clone.id, project.id);
    assert_eq!(clone.name, "Source (copy)");

    let cloned_roots = tiers::Entity::find()
        .filter(tiers::Column::ProjectId.eq(clone.id))
        .filter(tiers::Column::ParentId.is_null())
        .all(&db)
        .await?;
    assert_eq!(cloned_roots.len(), 1);

    let clone_values = aggregation.aggregate_tier(cloned_roots[0].id).await?;
    assert_eq!(clone_values.get("Score"), Some(&12.0));

    Ok(())
}
