use cpg_common::{Money, PaymentStatusType};
use serde_json::Value;
use thiserror::Error;

use crate::db_types::OrderNumber;

/// The details sent to the provider when a new payment is created.
#[derive(Debug, Clone)]
pub struct GatewayPaymentRequest {
    pub payment_id: String,
    pub amount: Money,
    pub currency: String,
    pub order_number: OrderNumber,
    pub customer_email: Option<String>,
}

/// A provider's view of a payment, already mapped onto the local status vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPaymentReport {
    /// The provider's identifier for the payment.
    pub transaction_id: String,
    /// The status exactly as the provider named it.
    pub provider_status: String,
    pub status: PaymentStatusType,
    /// The order reference the provider has on file, if any.
    pub order_number: Option<String>,
    pub raw: Value,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway is unavailable. {0}")]
    Unavailable(String),
    #[error("The payment gateway sent an invalid notification. {0}")]
    InvalidNotification(String),
}

impl GatewayError {
    /// The cause of the error, without the variant's prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Unavailable(s) | Self::InvalidNotification(s) => s.as_str(),
        }
    }
}

/// The operations the engine needs from a crypto payment provider.
///
/// Implementations must not retry failed calls. Retrying is left to the caller.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_payment(&self, request: GatewayPaymentRequest) -> Result<GatewayPaymentReport, GatewayError>;

    async fn check_status(&self, transaction_id: &str) -> Result<GatewayPaymentReport, GatewayError>;

    /// Checks the signature of a notification body exactly as it was received.
    fn verify_signature(&self, raw_body: &[u8], signature: &str) -> bool;

    /// Extracts a report from a notification. Only call this once the signature has been verified.
    fn parse_notification(&self, body: &Value) -> Result<GatewayPaymentReport, GatewayError>;
}
