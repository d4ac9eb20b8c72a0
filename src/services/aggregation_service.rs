use std::collections::{BTreeMap, HashMap, HashSet};

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::database::entities::{tier_data, tier_fields, tiers};
use crate::errors::{TierError, TierResult};
use crate::services::tier_service::subtree_ids;

/// Recursive bottom-up aggregation of numeric field values.
///
/// A leaf tier's displayed values are its stored values; a parent tier's
/// displayed value for each field is the sum over its children, merging
/// field-name-keyed maps by addition with missing keys treated as 0. The
/// whole subtree is recomputed on every read; no cache is kept between
/// requests.
#[derive(Clone)]
pub struct AggregationService {
    db: DatabaseConnection,
}

impl AggregationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Displayed numeric values for one tier, keyed by field name.
    pub async fn aggregate_tier(&self, tier_id: i32) -> TierResult<BTreeMap<String, f64>> {
        let mut per_tier = self.aggregate_subtree(tier_id).await?;
        Ok(per_tier.remove(&tier_id).unwrap_or_default())
    }

    /// Displayed numeric values for every tier in `tier_id`'s subtree.
    /// The export adapter walks this map to build its formula rows.
    pub async fn aggregate_subtree(
        &self,
        tier_id: i32,
    ) -> TierResult<HashMap<i32, BTreeMap<String, f64>>> {
        let tier = tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))?;

        let all = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(tier.project_id))
            .all(&self.db)
            .await?;
        let subtree = subtree_ids(&all, tier_id);

        let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
        for t in &all {
            if let Some(parent_id) = t.parent_id {
                children.entry(parent_id).or_default().push(t.id);
            }
        }

        let leaf_data = self.load_leaf_data(&subtree, &children).await?;

        let mut per_tier = HashMap::new();
        aggregate_node(tier_id, &children, &leaf_data, &mut per_tier);
        Ok(per_tier)
    }

    /// Stored numeric values per leaf tier, keyed by field name. Numeric
    /// fields without a stored row default to 0 for display.
    async fn load_leaf_data(
        &self,
        subtree: &[i32],
        children: &HashMap<i32, Vec<i32>>,
    ) -> TierResult<HashMap<i32, BTreeMap<String, f64>>> {
        let leaves: Vec<i32> = subtree
            .iter()
            .filter(|id| children.get(id).map_or(true, |c| c.is_empty()))
            .copied()
            .collect();

        let fields = tier_fields::Entity::find()
            .filter(tier_fields::Column::TierId.is_in(leaves.clone()))
            .all(&self.db)
            .await?;

        // Only numeric-typed fields aggregate; text, date and color fields
        // have no sensible parent display value
        let mut numeric_fields: HashMap<i32, (i32, String)> = HashMap::new();
        let mut leaf_data: HashMap<i32, BTreeMap<String, f64>> = HashMap::new();
        for field in &fields {
            let numeric = field.field_type().map_or(false, |ft| ft.is_numeric());
            if numeric {
                numeric_fields.insert(field.id, (field.tier_id, field.field_name.clone()));
                leaf_data
                    .entry(field.tier_id)
                    .or_default()
                    .insert(field.field_name.clone(), 0.0);
            }
        }

        let values = tier_data::Entity::find()
            .filter(tier_data::Column::TierId.is_in(leaves.clone()))
            .all(&self.db)
            .await?;
        for row in &values {
            if let Some((tier_id, name)) = numeric_fields.get(&row.field_id) {
                leaf_data
                    .entry(*tier_id)
                    .or_default()
                    .insert(name.clone(), row.value.unwrap_or(0.0));
            }
        }

        for leaf in leaves {
            leaf_data.entry(leaf).or_default();
        }

        Ok(leaf_data)
    }

    /// Field names that appear in the aggregate of any tier in the subtree,
    /// sorted. Used for export column layout.
    pub fn field_names(per_tier: &HashMap<i32, BTreeMap<String, f64>>) -> Vec<String> {
        let mut names: HashSet<&String> = HashSet::new();
        for map in per_tier.values() {
            names.extend(map.keys());
        }
        let mut names: Vec<String> = names.into_iter().cloned().collect();
        names.sort();
        names
    }
}

/// `aggregate(node) = node.data if no children else Σ aggregate(child)`,
/// merging field-keyed maps by addition. Fills `out` for the node and every
/// descendant.
fn aggregate_node(
    id: i32,
    children: &HashMap<i32, Vec<i32>>,
    leaf_data: &HashMap<i32, BTreeMap<String, f64>>,
    out: &mut HashMap<i32, BTreeMap<String, f64>>,
) -> BTreeMap<String, f64> {
    let kids = children.get(&id).map(|v| v.as_slice()).unwrap_or(&[]);
    let result = if kids.is_empty() {
        leaf_data.get(&id).cloned().unwrap_or_default()
    } else {
        let mut sum: BTreeMap<String, f64> = BTreeMap::new();
        for child in kids {
            let child_map = aggregate_node(*child, children, leaf_data, out);
            for (name, value) in child_map {
                *sum.entry(name).or_insert(0.0) += value;
            }
        }
        sum
    };

    out.insert(id, result.clone());
    result
}
