use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::database::entities::{tier_data, tier_fields, tiers, users};
use crate::errors::{TierError, TierResult};
use crate::services::ValidationService;

/// The tier tree engine: create, rename, delete, reorder and duplicate
/// operations over a project's hierarchy.
///
/// Every multi-step structural mutation runs inside a single transaction so
/// a failure partway through never leaves display_order or parent_id in a
/// half-updated state.
#[derive(Clone)]
pub struct TierService {
    db: DatabaseConnection,
}

impl TierService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Flat tier list for a project, ordered so siblings come out in display
    /// order. Callers group on parent_id to build the tree.
    pub async fn list_tiers(&self, project_id: i32) -> TierResult<Vec<tiers::Model>> {
        let tiers = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(project_id))
            .order_by_asc(tiers::Column::ParentId)
            .order_by_asc(tiers::Column::DisplayOrder)
            .all(&self.db)
            .await?;

        Ok(tiers)
    }

    pub async fn get_tier(&self, tier_id: i32) -> TierResult<tiers::Model> {
        tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))
    }

    /// Create a tier. Non-admin actors may only add children under a parent
    /// whose allow_child_creation gate is open. Sibling-name uniqueness is an
    /// advisory application-level check, not a storage constraint.
    pub async fn create_tier(
        &self,
        actor: &users::Model,
        project_id: i32,
        parent_id: Option<i32>,
        name: &str,
        allow_child_creation: bool,
    ) -> TierResult<tiers::Model> {
        let name = ValidationService::validate_tier_name(name)
            .map_err(|e| TierError::Validation(e.to_string()))?;

        let level = match parent_id {
            Some(parent_id) => {
                let parent = tiers::Entity::find_by_id(parent_id)
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| TierError::not_found("Tier", parent_id))?;

                if parent.project_id != project_id {
                    return Err(TierError::Conflict(format!(
                        "parent tier {} belongs to a different project",
                        parent_id
                    )));
                }

                if !actor.is_admin && !parent.allow_child_creation {
                    return Err(TierError::Forbidden(format!(
                        "tier '{}' does not allow child creation",
                        parent.name
                    )));
                }

                parent.level + 1
            }
            None => 0,
        };

        let siblings = self.siblings_of(project_id, parent_id).await?;
        if siblings.iter().any(|s| s.name == name) {
            return Err(TierError::Validation(format!(
                "a sibling tier named '{}' already exists",
                name
            )));
        }

        let now = Utc::now();
        let tier = tiers::ActiveModel {
            project_id: Set(project_id),
            parent_id: Set(parent_id),
            name: Set(name.clone()),
            level: Set(level),
            display_order: Set(siblings.len() as i32),
            allow_child_creation: Set(allow_child_creation),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let tier = tier.insert(&self.db).await?;
        info!("Created tier '{}' (id {})", name, tier.id);

        Ok(tier)
    }

    /// Rename a tier in place. Any authenticated actor may rename; no
    /// uniqueness enforcement here.
    pub async fn rename_tier(&self, tier_id: i32, name: &str) -> TierResult<tiers::Model> {
        let name = ValidationService::validate_tier_name(name)
            .map_err(|e| TierError::Validation(e.to_string()))?;

        let tier = self.get_tier(tier_id).await?;
        let mut active: tiers::ActiveModel = tier.into();
        active.name = Set(name);
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn set_allow_child_creation(
        &self,
        tier_id: i32,
        allow: bool,
    ) -> TierResult<tiers::Model> {
        let tier = self.get_tier(tier_id).await?;
        let mut active: tiers::ActiveModel = tier.into();
        active.allow_child_creation = Set(allow);
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Delete a tier and everything beneath it: descendant tiers via
    /// parent_id chains, plus their fields and values. Destructive, no
    /// soft-delete.
    pub async fn delete_tier(&self, tier_id: i32) -> TierResult<()> {
        let tier = self.get_tier(tier_id).await?;

        let txn = self.db.begin().await?;

        let all = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(tier.project_id))
            .all(&txn)
            .await?;
        let doomed = subtree_ids(&all, tier_id);

        tier_data::Entity::delete_many()
            .filter(tier_data::Column::TierId.is_in(doomed.clone()))
            .exec(&txn)
            .await?;
        tier_fields::Entity::delete_many()
            .filter(tier_fields::Column::TierId.is_in(doomed.clone()))
            .exec(&txn)
            .await?;
        tiers::Entity::delete_many()
            .filter(tiers::Column::Id.is_in(doomed.clone()))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!("Deleted tier {} and {} descendant(s)", tier_id, doomed.len() - 1);

        Ok(())
    }

    /// Move a tier to `new_index` among its siblings, optionally under a new
    /// parent. Both affected sibling groups come out with dense zero-based
    /// display_order. An index past the end clamps to append.
    ///
    /// `current_parent_id` is the parent the caller believes the tier is
    /// under; a mismatch with stored state fails with `Conflict` instead of
    /// reordering the wrong group.
    pub async fn reorder_tier(
        &self,
        tier_id: i32,
        new_index: usize,
        current_parent_id: Option<i32>,
        new_parent_id: Option<i32>,
    ) -> TierResult<()> {
        let txn = self.db.begin().await?;

        let tier = tiers::Entity::find_by_id(tier_id)
            .one(&txn)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))?;

        if tier.parent_id != current_parent_id {
            return Err(TierError::Conflict(format!(
                "tier {} is not a child of parent {:?}",
                tier_id, current_parent_id
            )));
        }

        let target_parent_id = match new_parent_id {
            Some(parent_id) => Some(parent_id),
            None => tier.parent_id,
        };
        let parent_changed = target_parent_id != tier.parent_id;

        let all = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(tier.project_id))
            .order_by_asc(tiers::Column::DisplayOrder)
            .all(&txn)
            .await?;
        let order_by_id: HashMap<i32, i32> =
            all.iter().map(|t| (t.id, t.display_order)).collect();

        // An empty remainder is a legitimate state: the moved tier may be a
        // sole child (or sole root), so no error here.
        let old_group: Vec<i32> = all
            .iter()
            .filter(|t| t.parent_id == tier.parent_id && t.id != tier_id)
            .map(|t| t.id)
            .collect();

        if parent_changed {
            let new_parent = all
                .iter()
                .find(|t| Some(t.id) == target_parent_id)
                .ok_or_else(|| {
                    TierError::not_found("Tier", target_parent_id.unwrap_or_default())
                })?
                .clone();

            let subtree = subtree_ids(&all, tier_id);
            if subtree.contains(&new_parent.id) {
                return Err(TierError::Conflict(format!(
                    "cannot move tier {} under its own subtree",
                    tier_id
                )));
            }

            // Depth is derived from tree shape, so reparenting shifts the
            // whole moved subtree's levels by the same delta.
            let delta = (new_parent.level + 1) - tier.level;
            if delta != 0 {
                let levels: HashMap<i32, i32> =
                    all.iter().map(|t| (t.id, t.level)).collect();
                for id in &subtree {
                    let mut active = tiers::ActiveModel {
                        id: Set(*id),
                        level: Set(levels[id] + delta),
                        ..Default::default()
                    };
                    if *id == tier_id {
                        active.updated_at = Set(Utc::now());
                    }
                    active.update(&txn).await?;
                }
            }

            tiers::ActiveModel {
                id: Set(tier_id),
                parent_id: Set(target_parent_id),
                updated_at: Set(Utc::now()),
                ..Default::default()
            }
            .update(&txn)
            .await?;

            // Close the gap left in the old sibling group
            Self::assign_display_order(&txn, &old_group, &order_by_id).await?;

            // Splice the moved tier into the new group at the target index
            let mut new_group: Vec<i32> = all
                .iter()
                .filter(|t| t.parent_id == target_parent_id && t.id != tier_id)
                .map(|t| t.id)
                .collect();
            let index = new_index.min(new_group.len());
            new_group.insert(index, tier_id);
            Self::assign_display_order(&txn, &new_group, &order_by_id).await?;
        } else {
            // Same parent: remove-then-insert at the requested index, then
            // reassign the whole group densely
            let mut group = old_group;
            let index = new_index.min(group.len());
            group.insert(index, tier_id);
            Self::assign_display_order(&txn, &group, &order_by_id).await?;

            tiers::ActiveModel {
                id: Set(tier_id),
                updated_at: Set(Utc::now()),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }

        txn.commit().await?;
        debug!("Reordered tier {} to index {}", tier_id, new_index);

        Ok(())
    }

    /// Deep-clone a tier's subtree in place: same parent, appended after the
    /// existing siblings. Fields and values are cloned with fresh ids; the
    /// original subtree is untouched.
    pub async fn duplicate_tier(&self, tier_id: i32) -> TierResult<tiers::Model> {
        let tier = self.get_tier(tier_id).await?;

        let siblings = self
            .siblings_of(tier.project_id, tier.parent_id)
            .await?;

        let txn = self.db.begin().await?;
        let clone = self
            .clone_subtree(
                &txn,
                &tier,
                tier.project_id,
                tier.parent_id,
                siblings.len() as i32,
            )
            .await?;
        txn.commit().await?;

        info!("Duplicated tier {} as {}", tier_id, clone.id);
        Ok(clone)
    }

    async fn siblings_of(
        &self,
        project_id: i32,
        parent_id: Option<i32>,
    ) -> TierResult<Vec<tiers::Model>> {
        let mut query = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(project_id));
        query = match parent_id {
            Some(parent_id) => query.filter(tiers::Column::ParentId.eq(parent_id)),
            None => query.filter(tiers::Column::ParentId.is_null()),
        };

        Ok(query
            .order_by_asc(tiers::Column::DisplayOrder)
            .all(&self.db)
            .await?)
    }

    pub async fn child_count(&self, tier_id: i32) -> TierResult<u64> {
        Ok(tiers::Entity::find()
            .filter(tiers::Column::ParentId.eq(tier_id))
            .count(&self.db)
            .await?)
    }

    async fn assign_display_order<C: ConnectionTrait>(
        conn: &C,
        ordered_ids: &[i32],
        current: &HashMap<i32, i32>,
    ) -> TierResult<()> {
        for (index, id) in ordered_ids.iter().enumerate() {
            let index = index as i32;
            if current.get(id) == Some(&index) {
                continue;
            }
            tiers::ActiveModel {
                id: Set(*id),
                display_order: Set(index),
                ..Default::default()
            }
            .update(conn)
            .await?;
        }
        Ok(())
    }

    /// Clone `source_root`'s subtree under (`target_project_id`,
    /// `target_parent_id`), walking parents before children so every clone
    /// can point at its already-remapped parent. Field and value rows are
    /// copied through tier-id and field-id remap tables; values whose field
    /// is somehow missing from the map are dropped.
    pub(crate) async fn clone_subtree<C: ConnectionTrait>(
        &self,
        conn: &C,
        source_root: &tiers::Model,
        target_project_id: i32,
        target_parent_id: Option<i32>,
        target_display_order: i32,
    ) -> TierResult<tiers::Model> {
        let all = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(source_root.project_id))
            .order_by_asc(tiers::Column::DisplayOrder)
            .all(conn)
            .await?;
        let source_ids = subtree_ids(&all, source_root.id);
        let by_id: HashMap<i32, &tiers::Model> = all.iter().map(|t| (t.id, t)).collect();

        let root_level = match target_parent_id {
            Some(parent_id) => {
                let parent = tiers::Entity::find_by_id(parent_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| TierError::not_found("Tier", parent_id))?;
                parent.level + 1
            }
            None => 0,
        };

        let mut tier_map: HashMap<i32, i32> = HashMap::new();
        let mut level_map: HashMap<i32, i32> = HashMap::new();
        let mut new_root: Option<tiers::Model> = None;
        let now = Utc::now();

        // subtree_ids returns parents before children
        for source_id in &source_ids {
            let source = by_id[source_id];

            let (new_parent_id, new_level, new_order) = if *source_id == source_root.id {
                (target_parent_id, root_level, target_display_order)
            } else {
                let source_parent = source
                    .parent_id
                    .ok_or_else(|| {
                        TierError::Conflict(format!(
                            "tier {} in subtree has no parent",
                            source_id
                        ))
                    })?;
                (
                    Some(tier_map[&source_parent]),
                    level_map[&source_parent] + 1,
                    source.display_order,
                )
            };

            let clone = tiers::ActiveModel {
                project_id: Set(target_project_id),
                parent_id: Set(new_parent_id),
                name: Set(source.name.clone()),
                level: Set(new_level),
                display_order: Set(new_order),
                allow_child_creation: Set(source.allow_child_creation),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            let clone = clone.insert(conn).await?;

            tier_map.insert(*source_id, clone.id);
            level_map.insert(*source_id, new_level);
            if *source_id == source_root.id {
                new_root = Some(clone);
            }
        }

        // Clone field definitions, building the field-id remap table
        let mut field_map: HashMap<i32, i32> = HashMap::new();
        let fields = tier_fields::Entity::find()
            .filter(tier_fields::Column::TierId.is_in(source_ids.clone()))
            .order_by_asc(tier_fields::Column::DisplayOrder)
            .all(conn)
            .await?;
        for field in &fields {
            let clone = tier_fields::ActiveModel {
                tier_id: Set(tier_map[&field.tier_id]),
                field_name: Set(field.field_name.clone()),
                field_type: Set(field.field_type.clone()),
                options: Set(field.options.clone()),
                display_order: Set(field.display_order),
                ..Default::default()
            };
            let clone = clone.insert(conn).await?;
            field_map.insert(field.id, clone.id);
        }

        // Clone values through both remap tables
        let values = tier_data::Entity::find()
            .filter(tier_data::Column::TierId.is_in(source_ids.clone()))
            .all(conn)
            .await?;
        for value in &values {
            let Some(&new_field_id) = field_map.get(&value.field_id) else {
                debug!(
                    "Skipping value {} with unmapped field {}",
                    value.id, value.field_id
                );
                continue;
            };
            tier_data::ActiveModel {
                tier_id: Set(tier_map[&value.tier_id]),
                field_id: Set(new_field_id),
                value: Set(value.value),
                text_value: Set(value.text_value.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?;
        }

        new_root.ok_or_else(|| {
            TierError::Conflict(format!("subtree of tier {} was empty", source_root.id))
        })
    }
}

/// Ids of `root_id` and all its descendants, parents before children.
pub(crate) fn subtree_ids(all: &[tiers::Model], root_id: i32) -> Vec<i32> {
    let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
    for tier in all {
        if let Some(parent_id) = tier.parent_id {
            children.entry(parent_id).or_default().push(tier.id);
        }
    }

    let mut result = Vec::new();
    let mut queue = VecDeque::from([root_id]);
    while let Some(id) = queue.pop_front() {
        result.push(id);
        if let Some(kids) = children.get(&id) {
            queue.extend(kids.iter().copied());
        }
    }
    result
}

/// Children of each tier keyed by parent id, in display order. Roots are
/// listed under `None`.
pub(crate) fn children_by_parent(
    all: &[tiers::Model],
) -> HashMap<Option<i32>, Vec<i32>> {
    let mut sorted: Vec<&tiers::Model> = all.iter().collect();
    sorted.sort_by_key(|t| t.display_order);

    let mut children: HashMap<Option<i32>, Vec<i32>> = HashMap::new();
    for tier in sorted {
        children.entry(tier.parent_id).or_default().push(tier.id);
    }
    children
}
