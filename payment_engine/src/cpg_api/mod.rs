//! # Payment engine public API
//!
//! [`payment_flow_api`] is the primary API for creating payments and reconciling them against the provider's view,
//! whether that arrives as a signed notification or as the result of a poll.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend and a payment provider:
//!
//! ```rust,ignore
//! use payment_engine::{events::EventProducers, PaymentFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = PaymentFlowApi::new(db, gateway, EventProducers::default());
//! let created = api.create_payment(&order_number, &requester, ip_address).await?;
//! ```
pub mod errors;
pub mod payment_flow_api;
pub mod payment_objects;
