use std::fmt::Display;

use cpg_common::{Money, PaymentStatusType};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{NowPaymentsApiError, NowPaymentsConfig};

//--------------------------------------   GatewayPaymentStatus   -----------------------------------------------------
/// The payment status vocabulary used by NOWPayments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GatewayPaymentStatus {
    Waiting,
    Confirming,
    Confirmed,
    Sending,
    PartiallyPaid,
    Finished,
    Failed,
    Refunded,
    Expired,
    Unknown(String),
}

impl GatewayPaymentStatus {
    /// Maps the provider's status onto the local payment lifecycle.
    ///
    /// Anything the provider adds in future maps to `Pending`, so an unrecognised status can never complete a payment.
    pub fn to_local(&self) -> PaymentStatusType {
        match self {
            Self::Waiting => PaymentStatusType::Pending,
            Self::Confirming | Self::Sending | Self::PartiallyPaid => PaymentStatusType::Processing,
            Self::Confirmed | Self::Finished => PaymentStatusType::Completed,
            Self::Failed | Self::Expired => PaymentStatusType::Failed,
            Self::Refunded => PaymentStatusType::Refunded,
            Self::Unknown(_) => PaymentStatusType::Pending,
        }
    }
}

impl From<String> for GatewayPaymentStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "waiting" => Self::Waiting,
            "confirming" => Self::Confirming,
            "confirmed" => Self::Confirmed,
            "sending" => Self::Sending,
            "partially_paid" => Self::PartiallyPaid,
            "finished" => Self::Finished,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            "expired" => Self::Expired,
            _ => Self::Unknown(value),
        }
    }
}

impl From<GatewayPaymentStatus> for String {
    fn from(value: GatewayPaymentStatus) -> Self {
        value.to_string()
    }
}

impl Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::Confirming => "confirming",
            Self::Confirmed => "confirmed",
            Self::Sending => "sending",
            Self::PartiallyPaid => "partially_paid",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Expired => "expired",
            Self::Unknown(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

//--------------------------------------      PaymentRequest      -----------------------------------------------------
/// The inputs for a new gateway payment.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Our own identifier for the payment attempt. Sent to the gateway as `custom_payment_id`.
    pub payment_id: String,
    pub amount: Money,
    pub currency: String,
    pub order_id: Option<String>,
    pub customer_email: Option<String>,
}

/// The JSON body for `POST /payment`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewGatewayPayment {
    #[serde(with = "rust_decimal::serde::float")]
    pub price_amount: Decimal,
    pub price_currency: String,
    pub pay_currency: String,
    pub ipn_callback_url: String,
    pub order_id: String,
    pub order_description: String,
    pub success_url: String,
    pub cancel_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_email: Option<String>,
    pub custom_payment_id: String,
}

impl NewGatewayPayment {
    pub fn new(request: &PaymentRequest, config: &NowPaymentsConfig) -> Result<Self, NowPaymentsApiError> {
        if !request.amount.is_positive() {
            return Err(NowPaymentsApiError::InvalidRequest(format!(
                "Payment amount must be positive, got {}",
                request.amount
            )));
        }
        let order_id = request.order_id.clone().unwrap_or_else(|| request.payment_id.clone());
        Ok(Self {
            price_amount: request.amount.to_decimal(),
            price_currency: request.currency.to_lowercase(),
            pay_currency: config.pay_currency.to_lowercase(),
            ipn_callback_url: config.ipn_callback_url(),
            order_description: format!("Payment for order {order_id}"),
            order_id,
            success_url: config.success_url(&request.payment_id),
            cancel_url: config.cancel_url(&request.payment_id),
            payer_email: request.customer_email.clone(),
            custom_payment_id: request.payment_id.clone(),
        })
    }
}

//--------------------------------------      GatewayPayment      -----------------------------------------------------
/// A payment as reported by the gateway, either on creation or from a status query.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayment {
    /// The gateway's identifier for this payment. Stored locally as the payment's `transaction_id`.
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    pub payment_status: GatewayPaymentStatus,
    #[serde(default)]
    pub pay_address: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price_amount: Option<Decimal>,
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    /// The full response, exactly as received.
    #[serde(skip)]
    pub raw: Value,
}

impl GatewayPayment {
    pub fn from_json(value: Value) -> Result<Self, NowPaymentsApiError> {
        let mut payment = serde_json::from_value::<Self>(value.clone())?;
        payment.raw = value;
        Ok(payment)
    }
}

//--------------------------------------     IpnNotification      -----------------------------------------------------
/// The fields of an Instant Payment Notification that the coordinator acts on.
///
/// Only construct this after the notification's signature has been checked.
#[derive(Debug, Clone, Deserialize)]
pub struct IpnNotification {
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    pub payment_status: GatewayPaymentStatus,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub pay_address: Option<String>,
}

impl IpnNotification {
    pub fn from_json(value: &Value) -> Result<Self, NowPaymentsApiError> {
        Ok(Self::deserialize(value)?)
    }
}

// The gateway has sent payment ids as both JSON numbers and strings.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a string or number, got {other}"))),
    }
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!("expected a string or number, got {other}"))),
    }
}
