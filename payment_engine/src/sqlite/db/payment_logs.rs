use chrono::Utc;
use log::trace;
use sqlx::{types::Json, SqliteConnection};

use crate::db_types::{NewPaymentLog, PaymentLog};

/// Appends an entry to the payment audit log. Entries can never be changed or removed afterwards.
pub async fn insert_log(log: NewPaymentLog, conn: &mut SqliteConnection) -> Result<PaymentLog, sqlx::Error> {
    let entry: PaymentLog = sqlx::query_as(
        r#"
            INSERT INTO payment_logs (payment_id, action, status, outcome, data, ip_address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(&log.payment_id)
    .bind(log.action)
    .bind(log.status)
    .bind(log.outcome)
    .bind(Json(&log.data))
    .bind(&log.ip_address)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Logged {} ({:?}) for payment {}", entry.action, entry.outcome, entry.payment_id);
    Ok(entry)
}

pub async fn fetch_logs_for_payment(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentLog>, sqlx::Error> {
    let logs = sqlx::query_as("SELECT * FROM payment_logs WHERE payment_id = $1 ORDER BY id ASC")
        .bind(payment_id)
        .fetch_all(conn)
        .await?;
    Ok(logs)
}
