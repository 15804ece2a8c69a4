use chrono::Utc;
use cpg_common::PaymentStatusType;
use log::{debug, trace};
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{NewOrder, Order, OrderNumber},
    traits::PaymentGatewayError,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let now = Utc::now();
    let total = order.total();
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                subtotal,
                tax,
                discount,
                total,
                currency,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_number.as_str())
    .bind(&order.user_id)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.discount)
    .bind(total)
    .bind(&order.currency)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(e) if is_unique_violation(&e) => Err(PaymentGatewayError::OrderAlreadyExists(order.order_number)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_order_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches the order while taking the database write lock. Use this as the first statement of a transaction that
/// reads and then modifies the order.
pub async fn lock_order(order_number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE order_number = $1 RETURNING *")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Updates the order to reflect a payment that has just moved to `new_status`.
///
/// * `completed`: the order is paid, and moves to `processing` if it was still `pending`.
/// * `failed`: the order's payment status becomes `failed`, unless it was already settled one way or another.
/// * `refunded`: the order is refunded.
///
/// Other statuses leave the order unchanged. Returns the order as it stands afterwards.
pub async fn apply_payment_status(
    order_id: i64,
    new_status: PaymentStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, PaymentGatewayError> {
    let now = Utc::now();
    let sql = match new_status {
        PaymentStatusType::Completed => {
            "UPDATE orders SET payment_status = 'paid', status = CASE WHEN status = 'pending' THEN 'processing' ELSE \
             status END, updated_at = $2 WHERE id = $1"
        },
        PaymentStatusType::Failed => {
            "UPDATE orders SET payment_status = 'failed', updated_at = $2 WHERE id = $1 AND payment_status = 'pending'"
        },
        PaymentStatusType::Refunded => {
            "UPDATE orders SET payment_status = 'refunded', status = 'refunded', updated_at = $2 WHERE id = $1"
        },
        PaymentStatusType::Pending | PaymentStatusType::Processing => "",
    };
    if !sql.is_empty() {
        let result = sqlx::query(sql).bind(order_id).bind(now).execute(&mut *conn).await?;
        trace!("🗃️ Order #{order_id}: {} rows updated for payment status {new_status}", result.rows_affected());
    }
    let order = fetch_order_by_id(order_id, conn)
        .await?
        .ok_or_else(|| PaymentGatewayError::OrderNotFound(format!("id {order_id}")))?;
    debug!("🗃️ Order {} is {} and {}", order.order_number, order.status, order.payment_status);
    Ok(order)
}
