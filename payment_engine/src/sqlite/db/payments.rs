use chrono::Utc;
use cpg_common::PaymentStatusType;
use log::debug;
use serde_json::Value;
use sqlx::{types::Json, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{NewPayment, Order, OrderNumber, Payment},
    traits::PaymentGatewayError,
};

/// Inserts a `pending` payment for the full amount of the order.
pub async fn insert_payment(
    payment: NewPayment,
    order: &Order,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let now = Utc::now();
    let result = sqlx::query_as(
        r#"
            INSERT INTO payments (
                payment_id,
                order_id,
                payment_method,
                amount,
                currency,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(&payment.payment_id)
    .bind(order.id)
    .bind(&payment.payment_method)
    .bind(order.total)
    .bind(&order.currency)
    .bind(PaymentStatusType::Pending)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(p) => {
            debug!("🗃️ Payment {} inserted for order {}", payment.payment_id, order.order_number);
            Ok(p)
        },
        Err(e) if is_unique_violation(&e) => Err(PaymentGatewayError::PaymentAlreadyExists(payment.payment_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_payment_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1").bind(payment_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_transaction_id(
    transaction_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payments_for_order(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as(
        r#"
        SELECT payments.* FROM payments
        JOIN orders ON payments.order_id = orders.id
        WHERE orders.order_number = $1
        ORDER BY payments.created_at ASC, payments.id ASC
        "#,
    )
    .bind(order_number.as_str())
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

/// Fetches the payment while taking the database write lock. Concurrent writers block here until the current
/// transaction completes, so this must be the first statement of any transaction that changes a payment's status.
pub async fn lock_payment(payment_id: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("UPDATE payments SET updated_at = updated_at WHERE payment_id = $1 RETURNING *")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Sets the payment status, and the latest provider payload if one is given.
pub async fn update_status(
    payment_id: &str,
    status: PaymentStatusType,
    payment_data: Option<&Value>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET
            status = $2,
            payment_data = COALESCE($3, payment_data),
            updated_at = $4
        WHERE payment_id = $1
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(status)
    .bind(payment_data.map(Json))
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentGatewayError::PaymentNotFound(payment_id.to_string()))?;
    Ok(payment)
}

/// Stores the provider's transaction id and response for the payment.
pub async fn set_gateway_details(
    payment_id: &str,
    transaction_id: &str,
    payment_data: &Value,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let payment = sqlx::query_as(
        r#"
        UPDATE payments SET transaction_id = $2, payment_data = $3, updated_at = $4
        WHERE payment_id = $1
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(transaction_id)
    .bind(Json(payment_data))
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| PaymentGatewayError::PaymentNotFound(payment_id.to_string()))?;
    Ok(payment)
}
