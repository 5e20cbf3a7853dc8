//! Email dispatch log persistence.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use quai_core::EmailRecord;

/// Append one dispatch record.
pub async fn insert(pool: &PgPool, record: &EmailRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO emails (accreditation_id, email, sent_at) VALUES ($1, $2, $3)",
    )
    .bind(record.accreditation_id)
    .bind(&record.email)
    .bind(record.sent_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Load the full dispatch log, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<EmailRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EmailRow>(
        "SELECT accreditation_id, email, sent_at FROM emails ORDER BY sent_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(EmailRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct EmailRow {
    accreditation_id: Uuid,
    email: String,
    sent_at: DateTime<Utc>,
}

impl EmailRow {
    fn into_record(self) -> EmailRecord {
        EmailRecord {
            accreditation_id: self.accreditation_id,
            email: self.email,
            sent_at: self.sent_at,
        }
    }
}
