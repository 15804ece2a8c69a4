use cpg_common::PaymentStatusType;
use thiserror::Error;

use crate::traits::{GatewayError, PaymentGatewayError};

#[derive(Debug, Clone, Error)]
pub enum PaymentFlowError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Order {0} not found")]
    OrderNotFound(String),
    #[error("Payment {0} not found")]
    PaymentNotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Order {0} is already paid")]
    AlreadyPaid(String),
    #[error("A payment cannot move from {from} to {to}")]
    InvalidTransition { from: PaymentStatusType, to: PaymentStatusType },
    #[error("The payment gateway is unavailable. {0}")]
    GatewayUnavailable(String),
    #[error("Invalid signature")]
    SignatureInvalid,
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<PaymentGatewayError> for PaymentFlowError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::OrderNotFound(o) => Self::OrderNotFound(o),
            PaymentGatewayError::PaymentNotFound(p) => Self::PaymentNotFound(p),
            PaymentGatewayError::AlreadyPaid(o) => Self::AlreadyPaid(o.to_string()),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<GatewayError> for PaymentFlowError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(s) => Self::GatewayUnavailable(s),
            GatewayError::InvalidNotification(s) => Self::ValidationError(s),
        }
    }
}
