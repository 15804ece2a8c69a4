//! # Crypto payment gateway server
//!
//! This crate hosts the HTTP front end of the payment gateway. It is responsible for:
//! * Starting payments for orders on behalf of authenticated customers.
//! * Receiving signed Instant Payment Notifications from NOWPayments.
//! * Reporting payment status, reconciling in-flight payments with the provider on request.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/payments/create`: Start a payment for an order.
//! * `POST /api/payments/ipn`: The NOWPayments IPN callback.
//! * `GET /api/payments/{payment_id}/status`: Payment status, reconciled with the provider if still in flight.
//! * `GET /api/payments/{payment_id}/logs`: The audit trail for a payment.
//! * `GET /api/orders/{order_number}/payments`: Every payment attempt for an order.
//! * `POST /api/admin/payments/{payment_id}/refund`: Staff only. Record a refund.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;
