use serde_json::Value;
use thiserror::Error;

use crate::db_types::{
    NewOrder,
    NewPayment,
    NewPaymentLog,
    Order,
    OrderNumber,
    Payment,
    PaymentLog,
    PaymentStatusUpdate,
    TransitionOutcome,
};

/// This trait defines the record store behind the payment engine.
///
/// The methods that change a payment's status do so in a single atomic transaction that locks the payment row first,
/// so that concurrent notifications and polls for the same payment are serialised.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order from checkout. Order numbers are unique.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber)
        -> Result<Option<Order>, PaymentGatewayError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, PaymentGatewayError>;

    /// In a single atomic transaction,
    /// * checks that the order exists and has not been paid already,
    /// * creates a `pending` payment for the order total,
    /// * writes a `create` entry to the payment log.
    ///
    /// Returns the order and the new payment.
    async fn create_payment_for_order(
        &self,
        payment: NewPayment,
        data: Value,
        ip_address: Option<String>,
    ) -> Result<(Order, Payment), PaymentGatewayError>;

    /// Stores the provider's id and response for a payment that the provider accepted, and logs a
    /// `gateway_created` entry. The payment status is not changed.
    async fn record_gateway_created(
        &self,
        payment_id: &str,
        transaction_id: &str,
        payment_data: Value,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentGatewayError>;

    /// Marks a payment that the provider refused (or never answered for) as `failed` and logs an `error` entry. The
    /// order is left untouched.
    async fn record_gateway_failure(
        &self,
        payment_id: &str,
        reason: &str,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentGatewayError>;

    /// Applies a status update, if the payment lifecycle allows it, along with its side effects on the order. A log
    /// entry is always written, whether or not the update was applied.
    async fn apply_status_update(&self, update: PaymentStatusUpdate) -> Result<TransitionOutcome, PaymentGatewayError>;

    async fn append_log(&self, log: NewPaymentLog) -> Result<PaymentLog, PaymentGatewayError>;

    async fn fetch_payment_by_payment_id(&self, payment_id: &str) -> Result<Option<Payment>, PaymentGatewayError>;

    async fn fetch_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, PaymentGatewayError>;

    /// The payments for an order, oldest first.
    async fn fetch_payments_for_order(&self, order_number: &OrderNumber) -> Result<Vec<Payment>, PaymentGatewayError>;

    /// The audit log for a payment, oldest first.
    async fn fetch_logs_for_payment(&self, payment_id: &str) -> Result<Vec<PaymentLog>, PaymentGatewayError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists: {0}")]
    OrderAlreadyExists(OrderNumber),
    #[error("Cannot insert payment, since it already exists: {0}")]
    PaymentAlreadyExists(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(String),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Order {0} has already been paid")]
    AlreadyPaid(OrderNumber),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
