use std::collections::{HashMap, HashSet};

use rust_xlsxwriter::{Formula, Workbook, XlsxError};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::info;

use crate::database::entities::{tier_data, tier_fields, tiers};
use crate::errors::{TierError, TierResult};
use crate::services::tier_service::subtree_ids;
use crate::services::AggregationService;

/// XLSX export of a tier subtree: one sheet per tier. Leaf sheets carry the
/// stored values; parent sheets carry `=SUM(...)` formulas referencing their
/// child sheets, so the workbook keeps recalculating live in spreadsheet
/// software instead of freezing the aggregates at export time.
#[derive(Clone)]
pub struct ExportService {
    db: DatabaseConnection,
    aggregation: AggregationService,
}

struct SheetPlan {
    tier_id: i32,
    name: String,
    /// Field name -> zero-based column index
    columns: HashMap<String, u16>,
    /// Column order for the header row
    header: Vec<String>,
    is_leaf: bool,
}

impl ExportService {
    pub fn new(db: DatabaseConnection) -> Self {
        let aggregation = AggregationService::new(db.clone());
        Self { db, aggregation }
    }

    pub async fn export_subtree_xlsx(&self, tier_id: i32) -> TierResult<Vec<u8>> {
        let tier = tiers::Entity::find_by_id(tier_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| TierError::not_found("Tier", tier_id))?;

        let all = tiers::Entity::find()
            .filter(tiers::Column::ProjectId.eq(tier.project_id))
            .order_by_asc(tiers::Column::DisplayOrder)
            .all(&self.db)
            .await?;
        let subtree = subtree_ids(&all, tier_id);
        let by_id: HashMap<i32, &tiers::Model> = all.iter().map(|t| (t.id, t)).collect();

        let mut children: HashMap<i32, Vec<i32>> = HashMap::new();
        for t in &all {
            if let Some(parent_id) = t.parent_id {
                if subtree.contains(&t.id) {
                    children.entry(parent_id).or_default().push(t.id);
                }
            }
        }

        let per_tier = self.aggregation.aggregate_subtree(tier_id).await?;

        let fields = tier_fields::Entity::find()
            .filter(tier_fields::Column::TierId.is_in(subtree.clone()))
            .order_by_asc(tier_fields::Column::DisplayOrder)
            .all(&self.db)
            .await?;
        let mut fields_by_tier: HashMap<i32, Vec<&tier_fields::Model>> = HashMap::new();
        for field in &fields {
            fields_by_tier.entry(field.tier_id).or_default().push(field);
        }

        let values = tier_data::Entity::find()
            .filter(tier_data::Column::TierId.is_in(subtree.clone()))
            .all(&self.db)
            .await?;
        let values_by_key: HashMap<(i32, i32), &tier_data::Model> = values
            .iter()
            .map(|v| ((v.tier_id, v.field_id), v))
            .collect();

        // Pass 1: plan every sheet so parent formulas can reference child
        // sheets by name and column, regardless of write order
        let mut used_names = HashSet::new();
        let mut plans: Vec<SheetPlan> = Vec::with_capacity(subtree.len());
        for id in &subtree {
            let tier = by_id[id];
            let is_leaf = children.get(id).map_or(true, |c| c.is_empty());

            let header: Vec<String> = if is_leaf {
                fields_by_tier
                    .get(id)
                    .map(|fields| fields.iter().map(|f| f.field_name.clone()).collect())
                    .unwrap_or_default()
            } else {
                // Parent sheets cover the aggregated numeric fields only
                per_tier
                    .get(id)
                    .map(|map| map.keys().cloned().collect())
                    .unwrap_or_default()
            };

            let columns = header
                .iter()
                .enumerate()
                .map(|(idx, name)| (name.clone(), idx as u16))
                .collect();

            plans.push(SheetPlan {
                tier_id: *id,
                name: build_sheet_name(&tier.name, &mut used_names, 31),
                columns,
                header,
                is_leaf,
            });
        }
        let plan_by_tier: HashMap<i32, usize> = plans
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.tier_id, idx))
            .collect();

        // Pass 2: write the workbook
        let mut workbook = Workbook::new();
        for plan in &plans {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&plan.name).map_err(xlsx_err)?;

            for (col, name) in plan.header.iter().enumerate() {
                worksheet
                    .write_string(0, col as u16, name)
                    .map_err(xlsx_err)?;
            }

            if plan.is_leaf {
                let Some(fields) = fields_by_tier.get(&plan.tier_id) else {
                    continue;
                };
                for field in fields {
                    let col = plan.columns[&field.field_name];
                    let stored = values_by_key.get(&(plan.tier_id, field.id));
                    let numeric = field.field_type().map_or(false, |ft| ft.is_numeric());
                    if numeric {
                        let value = stored.and_then(|v| v.value).unwrap_or(0.0);
                        worksheet.write_number(1, col, value).map_err(xlsx_err)?;
                    } else {
                        let text = stored
                            .and_then(|v| v.text_value.as_deref())
                            .unwrap_or("");
                        worksheet.write_string(1, col, text).map_err(xlsx_err)?;
                    }
                }
            } else {
                let kids = children.get(&plan.tier_id).cloned().unwrap_or_default();
                for (name, col) in &plan.columns {
                    let mut refs = Vec::new();
                    for kid in &kids {
                        let kid_plan = &plans[plan_by_tier[kid]];
                        if let Some(kid_col) = kid_plan.columns.get(name) {
                            refs.push(format!(
                                "'{}'!{}2",
                                kid_plan.name.replace('\'', "''"),
                                column_letter(*kid_col)
                            ));
                        }
                    }
                    if refs.is_empty() {
                        worksheet.write_number(1, *col, 0.0).map_err(xlsx_err)?;
                    } else {
                        let formula = format!("=SUM({})", refs.join(","));
                        worksheet
                            .write_formula(1, *col, Formula::new(&formula))
                            .map_err(xlsx_err)?;
                    }
                }
            }
        }

        let buffer = workbook.save_to_buffer().map_err(xlsx_err)?;
        info!(
            "Exported tier {} subtree ({} sheet(s), {} bytes)",
            tier_id,
            plans.len(),
            buffer.len()
        );
        Ok(buffer)
    }
}

fn xlsx_err(err: XlsxError) -> TierError {
    TierError::Export(err.to_string())
}

/// Worksheet names must be unique and at most `limit` chars; collide by
/// appending a counter inside the limit.
fn build_sheet_name(raw: &str, used: &mut HashSet<String>, limit: usize) -> String {
    let base = truncate_to_len(raw.trim(), limit);
    let base = if base.is_empty() {
        "Sheet".to_string()
    } else {
        base
    };

    if used.insert(base.clone()) {
        return base;
    }

    let mut counter = 2;
    loop {
        let suffix = format!(" ({})", counter);
        let prefix = truncate_to_len(&base, limit.saturating_sub(suffix.chars().count()));
        let candidate = format!("{}{}", prefix, suffix);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

fn truncate_to_len(name: &str, limit: usize) -> String {
    if name.chars().count() <= limit {
        return name.to_string();
    }
    name.chars().take(limit).collect()
}

/// Zero-based column index to spreadsheet letters: 0 -> A, 25 -> Z, 26 -> AA.
fn column_letter(mut col: u16) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_are_unique_and_bounded() {
        let mut used = HashSet::new();
        assert_eq!(build_sheet_name("Dept", &mut used, 31), "Dept");
        assert_eq!(build_sheet_name("Dept", &mut used, 31), "Dept (2)");
        assert_eq!(build_sheet_name("Dept", &mut used, 31), "Dept (3)");

        let long = "A very long tier name that exceeds the sheet limit";
        let name = build_sheet_name(long, &mut used, 31);
        assert_eq!(name.chars().count(), 31);
    }

    #[test]
    fn blank_names_fall_back() {
        let mut used = HashSet::new();
        assert_eq!(build_sheet_name("   ", &mut used, 31), "Sheet");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }
}
