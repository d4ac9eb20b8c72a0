use std::time::Duration;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::database::entities::{tier_data, tier_fields, tiers};
use crate::services::{ValueService, ValueWrite};

/// One progress event per processed record. The operation as a whole always
/// completes: per-record failures land in `errors` and processing continues.
#[derive(Clone, Debug, Serialize)]
pub struct BulkImportProgress {
    pub current: usize,
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ImportRecord {
    tier_id: i32,
    field_name: String,
    value: String,
}

/// Bulk value import from CSV (`tier_id,field_name,value`), streamed back to
/// the caller as incremental progress events rather than withheld until
/// completion. There is no cancel signal; a client that stops reading simply
/// abandons the stream.
#[derive(Clone)]
pub struct ImportService {
    db: DatabaseConnection,
}

impl ImportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn start_import(
        &self,
        project_id: i32,
        csv_data: String,
    ) -> ReceiverStream<BulkImportProgress> {
        let (tx, rx) = mpsc::channel(16);
        let db = self.db.clone();

        tokio::spawn(async move {
            run_import(db, project_id, csv_data, tx).await;
        });

        ReceiverStream::new(rx)
    }
}

async fn run_import(
    db: DatabaseConnection,
    project_id: i32,
    csv_data: String,
    tx: mpsc::Sender<BulkImportProgress>,
) {
    let mut reader = csv::Reader::from_reader(csv_data.as_bytes());
    let records: Vec<Result<ImportRecord, csv::Error>> = reader.deserialize().collect();
    let total = records.len();

    let value_service = ValueService::new(db.clone());

    let mut created = 0;
    let mut updated = 0;
    let mut skipped = 0;
    let mut errors: Vec<String> = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        let row = index + 1;
        let message = match record {
            Err(err) => {
                errors.push(format!("row {}: {}", row, err));
                format!("Row {} is malformed", row)
            }
            Ok(record) if record.value.trim().is_empty() => {
                skipped += 1;
                format!("Skipped empty value for '{}'", record.field_name)
            }
            Ok(record) => {
                match import_record(&db, &value_service, project_id, &record).await {
                    Ok(existed) => {
                        if existed {
                            updated += 1;
                        } else {
                            created += 1;
                        }
                        format!("Imported '{}' on tier {}", record.field_name, record.tier_id)
                    }
                    Err(err) => {
                        warn!("Import row {} failed: {}", row, err);
                        errors.push(format!("row {}: {}", row, err));
                        format!("Failed '{}' on tier {}", record.field_name, record.tier_id)
                    }
                }
            }
        };

        let progress = BulkImportProgress {
            current: row,
            total,
            created,
            updated,
            skipped,
            errors: errors.clone(),
            message,
        };
        if tx.send(progress).await.is_err() {
            // Caller stopped reading; nothing left to report to
            return;
        }

        // Intentional pacing between records, not a correctness requirement
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    info!(
        "Bulk import finished: {} created, {} updated, {} skipped, {} error(s)",
        created,
        updated,
        skipped,
        errors.len()
    );
    let _ = tx
        .send(BulkImportProgress {
            current: total,
            total,
            created,
            updated,
            skipped,
            errors,
            message: "Import complete".to_string(),
        })
        .await;
}

/// Import one record. Returns whether a stored value already existed for the
/// (tier, field) pair, to distinguish created from updated.
async fn import_record(
    db: &DatabaseConnection,
    value_service: &ValueService,
    project_id: i32,
    record: &ImportRecord,
) -> Result<bool, String> {
    let tier = tiers::Entity::find_by_id(record.tier_id)
        .one(db)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("tier {} not found", record.tier_id))?;
    if tier.project_id != project_id {
        return Err(format!(
            "tier {} belongs to a different project",
            record.tier_id
        ));
    }

    let field = tier_fields::Entity::find()
        .filter(tier_fields::Column::TierId.eq(record.tier_id))
        .filter(tier_fields::Column::FieldName.eq(record.field_name.as_str()))
        .one(db)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| {
            format!(
                "tier {} has no field named '{}'",
                record.tier_id, record.field_name
            )
        })?;

    let existed = tier_data::Entity::find()
        .filter(tier_data::Column::TierId.eq(record.tier_id))
        .filter(tier_data::Column::FieldId.eq(field.id))
        .one(db)
        .await
        .map_err(|e| e.to_string())?
        .is_some();

    let numeric = field.field_type().map_or(false, |ft| ft.is_numeric());
    let write = if numeric {
        let value: f64 = record
            .value
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", record.value))?;
        ValueWrite {
            field_id: field.id,
            value: Some(value),
            text_value: None,
        }
    } else {
        ValueWrite {
            field_id: field.id,
            value: None,
            text_value: Some(record.value.trim().to_string()),
        }
    };

    value_service
        .write_value(record.tier_id, &write)
        .await
        .map_err(|e| e.to_string())?;

    Ok(existed)
}
