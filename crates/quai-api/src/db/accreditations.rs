//! Accreditation persistence operations.
//!
//! Lifecycle constraints (state machine, write-once timestamps) are
//! enforced at the application layer, not in SQL.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use quai_core::{Accreditation, EventKey, Status, UnloadingProvider};

use super::vehicles;

/// Insert an accreditation and its vehicles in one transaction.
pub async fn insert(pool: &PgPool, record: &Accreditation) -> Result<(), sqlx::Error> {
    let mut tx: Transaction<'_, Postgres> = pool.begin().await?;

    sqlx::query(
        "INSERT INTO accreditations
         (id, created_at, company, stand, unloading, event, message, consent,
          status, entry_at, exit_at, email, sent_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(record.id)
    .bind(record.created_at)
    .bind(&record.company)
    .bind(&record.stand)
    .bind(record.unloading.as_str())
    .bind(record.event.as_str())
    .bind(&record.message)
    .bind(record.consent)
    .bind(record.status.as_str())
    .bind(record.entry_at)
    .bind(record.exit_at)
    .bind(&record.email)
    .bind(record.sent_at)
    .execute(&mut *tx)
    .await?;

    for vehicle in &record.vehicles {
        vehicles::insert_tx(&mut tx, record.id, vehicle).await?;
    }

    tx.commit().await
}

/// Update the top-level fields of an accreditation. Vehicles have their
/// own operations.
pub async fn update(pool: &PgPool, record: &Accreditation) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE accreditations SET
           company = $1, stand = $2, unloading = $3, event = $4, message = $5,
           consent = $6, status = $7, entry_at = $8, exit_at = $9,
           email = $10, sent_at = $11
         WHERE id = $12",
    )
    .bind(&record.company)
    .bind(&record.stand)
    .bind(record.unloading.as_str())
    .bind(record.event.as_str())
    .bind(&record.message)
    .bind(record.consent)
    .bind(record.status.as_str())
    .bind(record.entry_at)
    .bind(record.exit_at)
    .bind(&record.email)
    .bind(record.sent_at)
    .bind(record.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an accreditation. Vehicles cascade; history and email records
/// stay behind as audit artifacts.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM accreditations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all accreditations with their vehicles into the in-memory store
/// on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Accreditation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccreditationRow>(
        "SELECT id, created_at, company, stand, unloading, event, message, consent,
                status, entry_at, exit_at, email, sent_at
         FROM accreditations ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let vehicles = vehicles::load_for(pool, row.id).await?;
        records.push(row.into_record(vehicles));
    }
    Ok(records)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AccreditationRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    company: String,
    stand: String,
    unloading: String,
    event: String,
    message: String,
    consent: bool,
    status: String,
    entry_at: Option<DateTime<Utc>>,
    exit_at: Option<DateTime<Utc>>,
    email: Option<String>,
    sent_at: Option<DateTime<Utc>>,
}

impl AccreditationRow {
    fn into_record(self, vehicles: Vec<quai_core::Vehicle>) -> Accreditation {
        let unloading = parse_enum_column(&self.unloading, self.id, "unloading")
            .unwrap_or(UnloadingProvider::Palais);
        let event = parse_enum_column(&self.event, self.id, "event").unwrap_or(EventKey::Festival);
        let status = Status::parse(&self.status).unwrap_or_else(|| {
            tracing::warn!(id = %self.id, status = %self.status,
                "unknown status in database, defaulting to ATTENTE");
            Status::Attente
        });

        Accreditation {
            id: self.id,
            created_at: self.created_at,
            company: self.company,
            stand: self.stand,
            unloading,
            event,
            message: self.message,
            consent: self.consent,
            status,
            entry_at: self.entry_at,
            exit_at: self.exit_at,
            email: self.email,
            sent_at: self.sent_at,
            vehicles,
        }
    }
}

fn parse_enum_column<T: serde::de::DeserializeOwned>(
    raw: &str,
    id: Uuid,
    column: &str,
) -> Option<T> {
    match serde_json::from_value(serde_json::Value::String(raw.to_string())) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%id, %column, %raw, %err, "unknown enum value in database");
            None
        }
    }
}
