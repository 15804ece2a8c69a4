//! Crypto Payment Engine
//!
//! The payment engine coordinates the lifecycle of crypto payments made against merchant orders. It is
//! provider-agnostic: the payment provider is reached through the [`PaymentGateway`] trait, and records are kept by a
//! backend implementing [`PaymentGatewayDatabase`].
//!
//! The library is divided into three main sections:
//! 1. Database management ([`mod@traits`] and the SQLite backend). Payments only ever move forward through their
//!    lifecycle, and every action against a payment is written to an append-only audit log.
//! 2. The public API ([`PaymentFlowApi`]). Payments are created synchronously, and then reconciled either by signed
//!    notifications from the provider, or by polling the provider for the current status. All three paths are
//!    idempotent.
//! 3. Events ([`mod@events`]). Subscribers are notified when an order becomes paid.
mod cpg_api;

pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use cpg_api::{
    errors::PaymentFlowError,
    payment_flow_api::PaymentFlowApi,
    payment_objects::{CreatedPayment, Requester},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db, SqliteDatabase};
pub use traits::{PaymentGateway, PaymentGatewayDatabase};
