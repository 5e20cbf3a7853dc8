//! Audit history persistence operations.
//!
//! Append-only. `accreditation_id` is deliberately not a foreign key:
//! the trail must survive deletion of its accreditation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quai_core::{HistoryAction, HistoryEntry};

/// Append one history entry.
pub async fn insert(pool: &PgPool, entry: &HistoryEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO history
         (id, accreditation_id, action, field, old_value, new_value,
          description, created_at, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(entry.id)
    .bind(entry.accreditation_id)
    .bind(entry.action.as_str())
    .bind(&entry.field)
    .bind(&entry.old_value)
    .bind(&entry.new_value)
    .bind(&entry.description)
    .bind(entry.created_at)
    .bind(&entry.user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the full trail, oldest first. Callers reverse for display.
pub async fn load_all(pool: &PgPool) -> Result<Vec<HistoryEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT id, accreditation_id, action, field, old_value, new_value,
                description, created_at, user_id
         FROM history ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(HistoryRow::into_entry).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    accreditation_id: Uuid,
    action: String,
    field: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    description: String,
    created_at: DateTime<Utc>,
    user_id: Option<String>,
}

impl HistoryRow {
    fn into_entry(self) -> Option<HistoryEntry> {
        let action = match HistoryAction::parse(&self.action) {
            Some(action) => action,
            None => {
                tracing::warn!(id = %self.id, action = %self.action,
                    "unknown history action in database, skipping entry");
                return None;
            }
        };
        Some(HistoryEntry {
            id: self.id,
            accreditation_id: self.accreditation_id,
            action,
            field: self.field,
            old_value: self.old_value,
            new_value: self.new_value,
            description: self.description,
            created_at: self.created_at,
            user_id: self.user_id,
        })
    }
}
