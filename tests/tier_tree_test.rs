//! Tier tree structure tests
//!
//! Tests for tier creation, sibling ordering, reorder, reparent and
//! cascading deletes.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tempfile::NamedTempFile;

use tierdesk::database::entities::{projects, tier_data, tier_fields, tiers, users};
use tierdesk::database::setup_database;
use tierdesk::errors::TierError;
use tierdesk::services::{FieldService, TierService, ValueService, ValueWrite};

async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

async fn create_user(db: &DatabaseConnection, is_admin: bool) -> Result<users::Model> {
    let user = users::ActiveModel {
        email: Set(format!("user-{}@example.com", if is_admin { "admin" } else { "member" })),
        display_name: Set(None),
        is_admin: Set(is_admin),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(user.insert(db).await?)
}

async fn create_project(db: &DatabaseConnection, owner: &users::Model) -> Result<projects::Model> {
    let now = Utc::now();
    let project = projects::ActiveModel {
        name: Set("Test Project".to_string()),
        created_by: Set(owner.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(project.insert(db).await?)
}

async fn sibling_order(
    db: &DatabaseConnection,
    project_id: i32,
    parent_id: Option<i32>,
) -> Result<Vec<(String, i32)>> {
    let mut query = tiers::Entity::find().filter(tiers::Column::ProjectId.eq(project_id));
    query = match parent_id {
        Some(id) => query.filter(tiers::Column::ParentId.eq(id)),
        None => query.filter(tiers::Column::ParentId.is_null()),
    };
    let siblings = query
        .order_by_asc(tiers::Column::DisplayOrder)
        .all(db)
        .await?;
    Ok(siblings
        .into_iter()
        .map(|t| (t.name, t.display_order))
        .collect())
}

#[tokio::test]
async fn test_create_tier_levels_and_order() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let dept = service
        .create_tier(&admin, project.id, None, "Department", true)
        .await?;
    assert_eq!(dept.level, 0);
    assert_eq!(dept.display_order, 0);

    let team_a = service
        .create_tier(&admin, project.id, Some(dept.id), "Team A", true)
        .await?;
    let team_b = service
        .create_tier(&admin, project.id, Some(dept.id), "Team B", true)
        .await?;
    assert_eq!(team_a.level, 1);
    assert_eq!(team_b.level, 1);
    assert_eq!(team_a.display_order, 0);
    assert_eq!(team_b.display_order, 1);

    Ok(())
}

#[tokio::test]
async fn test_create_tier_rejects_duplicate_sibling_name() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    service
        .create_tier(&admin, project.id, None, "Department", true)
        .await?;
    let err = service
        .create_tier(&admin, project.id, None, "Department", true)
        .await
        .unwrap_err();
    assert!(matches!(err, TierError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn test_child_creation_gate_applies_to_non_admins() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let member = create_user(&db, false).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let locked = service
        .create_tier(&admin, project.id, None, "Locked", false)
        .await?;

    let err = service
        .create_tier(&member, project.id, Some(locked.id), "Child", true)
        .await
        .unwrap_err();
    assert!(matches!(err, TierError::Forbidden(_)));

    // Admins bypass the gate
    let child = service
        .create_tier(&admin, project.id, Some(locked.id), "Child", true)
        .await?;
    assert_eq!(child.parent_id, Some(locked.id));

    Ok(())
}

#[tokio::test]
async fn test_reorder_within_same_parent() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let dept = service
        .create_tier(&admin, project.id, None, "Department", true)
        .await?;
    service
        .create_tier(&admin, project.id, Some(dept.id), "Team A", true)
        .await?;
    let team_b = service
        .create_tier(&admin, project.id, Some(dept.id), "Team B", true)
        .await?;
    service
        .create_tier(&admin, project.id, Some(dept.id), "Team C", true)
        .await?;

    service
        .reorder_tier(team_b.id, 0, Some(dept.id), None)
        .await?;

    let order = sibling_order(&db, project.id, Some(dept.id)).await?;
    assert_eq!(
        order,
        vec![
            ("Team B".to_string(), 0),
            ("Team A".to_string(), 1),
            ("Team C".to_string(), 2),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_reorder_clamps_out_of_range_index() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let dept = service
        .create_tier(&admin, project.id, None, "Department", true)
        .await?;
    let team_a = service
        .create_tier(&admin, project.id, Some(dept.id), "Team A", true)
        .await?;
    service
        .create_tier(&admin, project.id, Some(dept.id), "Team B", true)
        .await?;

    service
        .reorder_tier(team_a.id, 99, Some(dept.id), None)
        .await?;

    let order = sibling_order(&db, project.id, Some(dept.id)).await?;
    assert_eq!(
        order,
        vec![("Team B".to_string(), 0), ("Team A".to_string(), 1)]
    );

    Ok(())
}

#[tokio::test]
async fn test_reorder_rejects_stale_parent() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let dept = service
        .create_tier(&admin, project.id, None, "Department", true)
        .await?;
    let team_a = service
        .create_tier(&admin, project.id, Some(dept.id), "Team A", true)
        .await?;

    // Caller believes Team A is a root tier; stored state disagrees
    let err = service
        .reorder_tier(team_a.id, 0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TierError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn test_reparent_recomputes_levels_for_subtree() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let root_a = service
        .create_tier(&admin, project.id, None, "Root A", true)
        .await?;
    let root_b = service
        .create_tier(&admin, project.id, None, "Root B", true)
        .await?;
    let branch = service
        .create_tier(&admin, project.id, Some(root_a.id), "Branch", true)
        .await?;
    let leaf = service
        .create_tier(&admin, project.id, Some(branch.id), "Leaf", true)
        .await?;
    assert_eq!(branch.level, 1);
    assert_eq!(leaf.level, 2);

    // Move Branch (and its subtree) under Root B > Middle
    let middle = service
        .create_tier(&admin, project.id, Some(root_b.id), "Middle", true)
        .await?;
    service
        .reorder_tier(branch.id, 0, Some(root_a.id), Some(middle.id))
        .await?;

    let branch = tiers::Entity::find_by_id(branch.id).one(&db).await?.unwrap();
    let leaf = tiers::Entity::find_by_id(leaf.id).one(&db).await?.unwrap();
    assert_eq!(branch.parent_id, Some(middle.id));
    assert_eq!(branch.level, 2);
    assert_eq!(leaf.level, 3);

    // The vacated group stays dense
    let order = sibling_order(&db, project.id, Some(root_a.id)).await?;
    assert!(order.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_reorder_rejects_move_into_own_subtree() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let service = TierService::new(db.clone());

    let root = service
        .create_tier(&admin, project.id, None, "Root", true)
        .await?;
    let child = service
        .create_tier(&admin, project.id, Some(root.id), "Child", true)
        .await?;

    let err = service
        .reorder_tier(root.id, 0, None, Some(child.id))
        .await
        .unwrap_err();
    assert!(matches!(err, TierError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn test_delete_tier_cascades_to_descendants() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let admin = create_user(&db, true).await?;
    let project = create_project(&db, &admin).await?;
    let tier_service = TierService::new(db.clone());
    let field_service = FieldService::new(db.clone());
    let value_service = ValueService::new(db.clone());

    let dept = tier_service
        .create_tier(&admin, project.id, None, "Department", true)
        .await?;
    let team = tier_service
        .create_tier(&admin, project.id, Some(dept.id), "Team", true)
        .await?;
    let keep = tier_service
        .create_tier(&admin, project.id, None, "Keep", true)
        .await?;

    let field = field_service
        .add_field(team.id, "Score", "number", None)
        .await?;
    value_service
        .write_value(
            team.id,
            &ValueWrite {
                field_id: field.id,
                value: Some(5.0),
                text_value: None,
            },
        )
        .await?;

    tier_service.delete_tier(dept.id).await?;

    let remaining = tiers::Entity::find()
        .filter(tiers::Column::ProjectId.eq(project.id))
        .all(&db)
        .await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);

    let fields = tier_fields::Entity::find().all(&db).await?;
    assert!(fields.is_empty());
    let values = tier_data::Entity::find().all(&db).await?;
    assert!(values.is_empty());

    Ok(())
}
