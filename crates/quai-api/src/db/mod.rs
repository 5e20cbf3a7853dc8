//! # Database Persistence Layer
//!
//! Postgres persistence via SQLx. The layer is **optional**: when
//! `DATABASE_URL` is set, accreditations, vehicles, history entries and
//! email dispatch records are mirrored to Postgres and reloaded on
//! startup. When absent, the service runs in-memory only (development
//! and tests).
//!
//! Schema notes:
//! - `vehicles` cascades on accreditation deletion.
//! - `history` and `emails` reference the accreditation id without a
//!   foreign key, so the audit trail survives deletion of its parent.
//! - `vehicles.unloading` is stored as TEXT holding a JSON array; the
//!   read path normalizes legacy shapes (plain string, JSON string,
//!   empty) on every load.

pub mod accreditations;
pub mod emails;
pub mod history;
pub mod vehicles;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration
/// fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 Accreditations will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
