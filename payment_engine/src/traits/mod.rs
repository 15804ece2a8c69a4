//! # Backend contracts
//!
//! The payment engine talks to the outside world through two traits:
//!
//! * [`PaymentGatewayDatabase`] defines the record store for orders, payments and the payment audit log. Backends must
//!   perform each status transition (check, write, log) atomically.
//! * [`PaymentGateway`] defines the operations the engine needs from a crypto payment provider.
mod payment_gateway;
mod payment_gateway_database;

pub use payment_gateway::{GatewayError, GatewayPaymentReport, GatewayPaymentRequest, PaymentGateway};
pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError};
