use chrono::{DateTime, Utc};
use payment_engine::{
    db_types::{Money, Payment, PaymentStatusType},
    CreatedPayment,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    /// The order number of the order being paid for.
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub payment_id: String,
    pub status: PaymentStatusType,
    pub gateway_data: Value,
}

impl From<CreatedPayment> for CreatePaymentResponse {
    fn from(created: CreatedPayment) -> Self {
        Self { payment_id: created.payment.payment_id, status: created.payment.status, gateway_data: created.gateway_data }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub payment_id: String,
    pub status: PaymentStatusType,
    pub amount: Money,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentStatusResponse {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.payment_id,
            status: p.status,
            amount: p.amount,
            currency: p.currency,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefundRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
}

impl JsonResponse {
    pub fn success() -> Self {
        Self { status: "success".into() }
    }
}
