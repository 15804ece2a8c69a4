use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use cpg_common::{Money, PaymentStatusType, Transition, DEFAULT_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
pub use sqlx::types::Json;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      OrderNumber      ---------------------------------------------------------
/// The merchant-facing order reference, e.g. `ORD-AB12CD34`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConversionError("Order number cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// Newly placed, nothing has been paid yet.
    #[default]
    Pending,
    /// Paid for and being fulfilled by the merchant.
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------  OrderPaymentStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Display for OrderPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    /// The account that placed the order.
    pub user_id: String,
    pub status: OrderStatusType,
    pub payment_status: OrderPaymentStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == OrderPaymentStatus::Paid
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// An order as handed over by checkout.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub user_id: String,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub currency: String,
}

impl NewOrder {
    pub fn new(order_number: OrderNumber, user_id: String, subtotal: Money) -> Self {
        Self {
            order_number,
            user_id,
            subtotal,
            tax: Money::default(),
            discount: Money::default(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }

    pub fn with_tax(mut self, tax: Money) -> Self {
        self.tax = tax;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn total(&self) -> Money {
        self.subtotal + self.tax - self.discount
    }
}

//--------------------------------------       Payment         ---------------------------------------------------------
pub const CRYPTO_PAYMENT_METHOD: &str = "crypto";

/// A single attempt at paying for an order.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    /// Our identifier for the payment, `PAY-` followed by 12 upper-case hex characters.
    pub payment_id: String,
    /// The internal id of the order this payment is for.
    pub order_id: i64,
    pub payment_method: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatusType,
    /// The provider's identifier for the payment. Only known once the provider has accepted the payment.
    pub transaction_id: Option<String>,
    /// The most recent payload received from the provider.
    pub payment_data: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

//--------------------------------------      NewPayment       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_id: String,
    pub order_number: OrderNumber,
    pub payment_method: String,
}

impl NewPayment {
    pub fn new(payment_id: String, order_number: OrderNumber) -> Self {
        Self { payment_id, order_number, payment_method: CRYPTO_PAYMENT_METHOD.to_string() }
    }
}

//--------------------------------------      LogAction        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LogAction {
    /// A payment record was created locally.
    Create,
    /// The provider accepted the payment.
    GatewayCreated,
    /// The provider was polled for the payment's status.
    StatusCheck,
    /// The provider sent a notification for the payment.
    Webhook,
    Refund,
    /// Something went wrong talking to the provider.
    Error,
}

impl Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::GatewayCreated => "gateway_created",
            Self::StatusCheck => "status_check",
            Self::Webhook => "webhook",
            Self::Refund => "refund",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

//--------------------------------------      LogOutcome       ---------------------------------------------------------
/// What became of the action that a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LogOutcome {
    Applied,
    NoOp,
    Rejected,
    Error,
}

impl From<Transition> for LogOutcome {
    fn from(t: Transition) -> Self {
        match t {
            Transition::Apply => Self::Applied,
            Transition::NoOp => Self::NoOp,
            Transition::Reject => Self::Rejected,
        }
    }
}

//--------------------------------------      PaymentLog       ---------------------------------------------------------
/// An immutable audit record of an action taken against a payment.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PaymentLog {
    pub id: i64,
    pub payment_id: String,
    pub action: LogAction,
    /// The payment status that the action reported or requested.
    pub status: PaymentStatusType,
    pub outcome: LogOutcome,
    /// The raw payload at the time of the action.
    pub data: Json<Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPaymentLog {
    pub payment_id: String,
    pub action: LogAction,
    pub status: PaymentStatusType,
    pub outcome: LogOutcome,
    pub data: Value,
    pub ip_address: Option<String>,
}

impl NewPaymentLog {
    pub fn new(payment_id: &str, action: LogAction, status: PaymentStatusType, outcome: LogOutcome) -> Self {
        Self { payment_id: payment_id.to_string(), action, status, outcome, data: Value::Null, ip_address: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

//--------------------------------------  PaymentStatusUpdate  ---------------------------------------------------------
/// A request to move a payment to a new status, from a notification, a poll, or a refund.
#[derive(Debug, Clone)]
pub struct PaymentStatusUpdate {
    pub payment_id: String,
    pub new_status: PaymentStatusType,
    pub action: LogAction,
    /// The payload that prompted the update. It is always logged, and stored on the payment if the update is applied.
    pub data: Value,
    pub ip_address: Option<String>,
}

//--------------------------------------  TransitionOutcome    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub payment: Payment,
    pub order: Order,
    pub transition: Transition,
    pub log: PaymentLog,
    /// True if this update is the one that marked the order as paid.
    pub order_paid: bool,
}
