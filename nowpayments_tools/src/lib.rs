//! A thin client for the NOWPayments REST API.
//!
//! The client covers the three things the payment coordinator needs from the provider: creating a payment, querying
//! the status of an existing payment, and verifying the HMAC signature that accompanies every Instant Payment
//! Notification (IPN).
mod api;
mod config;
mod data_objects;
mod error;
mod signature;

pub use api::NowPaymentsApi;
pub use config::{NowPaymentsConfig, PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
pub use data_objects::{GatewayPayment, GatewayPaymentStatus, IpnNotification, PaymentRequest};
pub use error::NowPaymentsApiError;
pub use signature::{calculate_signature, canonical_json, verify_signature, SIGNATURE_HEADER};
