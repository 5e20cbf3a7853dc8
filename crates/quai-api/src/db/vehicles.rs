//! Vehicle persistence operations.
//!
//! `unloading` is a TEXT column holding a JSON array of sides. Older
//! rows may hold a bare side name or a doubly-encoded JSON string;
//! [`quai_core::normalize_unloading_text`] absorbs all of those on
//! every read.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use quai_core::{normalize_unloading_text, Vehicle, VehicleSize};

/// Insert one vehicle inside an open transaction.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    accreditation_id: Uuid,
    vehicle: &Vehicle,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO vehicles
         (id, accreditation_id, plate, size, phone_code, phone_number,
          date, time, city, unloading, kms)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(vehicle.id)
    .bind(accreditation_id)
    .bind(&vehicle.plate)
    .bind(vehicle.size.as_str())
    .bind(&vehicle.phone_code)
    .bind(&vehicle.phone_number)
    .bind(&vehicle.date)
    .bind(&vehicle.time)
    .bind(&vehicle.city)
    .bind(encode_unloading(vehicle))
    .bind(&vehicle.kms)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert one vehicle outside a transaction.
pub async fn insert(
    pool: &PgPool,
    accreditation_id: Uuid,
    vehicle: &Vehicle,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    insert_tx(&mut tx, accreditation_id, vehicle).await?;
    tx.commit().await
}

/// Update one vehicle's fields.
pub async fn update(pool: &PgPool, vehicle: &Vehicle) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE vehicles SET
           plate = $1, size = $2, phone_code = $3, phone_number = $4,
           date = $5, time = $6, city = $7, unloading = $8, kms = $9
         WHERE id = $10",
    )
    .bind(&vehicle.plate)
    .bind(vehicle.size.as_str())
    .bind(&vehicle.phone_code)
    .bind(&vehicle.phone_number)
    .bind(&vehicle.date)
    .bind(&vehicle.time)
    .bind(&vehicle.city)
    .bind(encode_unloading(vehicle))
    .bind(&vehicle.kms)
    .bind(vehicle.id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete one vehicle.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace every vehicle of an accreditation in one transaction.
pub async fn replace_all(
    pool: &PgPool,
    accreditation_id: Uuid,
    vehicles: &[Vehicle],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM vehicles WHERE accreditation_id = $1")
        .bind(accreditation_id)
        .execute(&mut *tx)
        .await?;
    for vehicle in vehicles {
        insert_tx(&mut tx, accreditation_id, vehicle).await?;
    }
    tx.commit().await
}

/// Load the vehicles of one accreditation in insertion order.
pub async fn load_for(pool: &PgPool, accreditation_id: Uuid) -> Result<Vec<Vehicle>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VehicleRow>(
        "SELECT id, plate, size, phone_code, phone_number, date, time, city, unloading, kms
         FROM vehicles WHERE accreditation_id = $1 ORDER BY seq",
    )
    .bind(accreditation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VehicleRow::into_vehicle).collect())
}

fn encode_unloading(vehicle: &Vehicle) -> String {
    serde_json::to_string(&vehicle.unloading).unwrap_or_else(|_| "[]".to_string())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    plate: String,
    size: String,
    phone_code: String,
    phone_number: String,
    date: String,
    time: String,
    city: String,
    unloading: String,
    kms: Option<String>,
}

impl VehicleRow {
    fn into_vehicle(self) -> Vehicle {
        let size = serde_json::from_value(serde_json::Value::String(self.size.clone()))
            .unwrap_or_else(|_| {
                tracing::warn!(id = %self.id, size = %self.size,
                    "unknown vehicle size in database, defaulting to -10");
                VehicleSize::Under10
            });

        Vehicle {
            id: self.id,
            plate: self.plate,
            size,
            phone_code: self.phone_code,
            phone_number: self.phone_number,
            date: self.date,
            time: self.time,
            city: self.city,
            unloading: normalize_unloading_text(&self.unloading),
            kms: self.kms,
        }
    }
}
