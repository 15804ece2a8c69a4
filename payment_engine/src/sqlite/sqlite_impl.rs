//! `SqliteDatabase` is a concrete implementation of a payment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements [`PaymentGatewayDatabase`].
use std::fmt::Debug;

use cpg_common::{PaymentStatusType, Transition};
use log::*;
use serde_json::{json, Value};
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite, SqlitePool};

use super::db::{db_url, new_pool, orders, payment_logs, payments};
use crate::{
    db_types::{
        LogAction,
        LogOutcome,
        NewOrder,
        NewPayment,
        NewPaymentLog,
        Order,
        OrderNumber,
        Payment,
        PaymentLog,
        PaymentStatusUpdate,
        TransitionOutcome,
    },
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_number, order.id);
        Ok(order)
    }

    async fn fetch_order_by_order_number(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn create_payment_for_order(
        &self,
        payment: NewPayment,
        data: Value,
        ip_address: Option<String>,
    ) -> Result<(Order, Payment), PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::lock_order(&payment.order_number, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::OrderNotFound(payment.order_number.to_string()))?;
        if order.is_paid() {
            debug!("🗃️ Order {} is already paid. Not creating a new payment.", order.order_number);
            return Err(PaymentGatewayError::AlreadyPaid(order.order_number));
        }
        let payment = payments::insert_payment(payment, &order, &mut tx).await?;
        let log = NewPaymentLog::new(&payment.payment_id, LogAction::Create, payment.status, LogOutcome::Applied)
            .with_data(data)
            .with_ip_address(ip_address);
        payment_logs::insert_log(log, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {} of {} created for order {}", payment.payment_id, payment.amount, order.order_number);
        Ok((order, payment))
    }

    async fn record_gateway_created(
        &self,
        payment_id: &str,
        transaction_id: &str,
        payment_data: Value,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        payments::lock_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::PaymentNotFound(payment_id.to_string()))?;
        let payment = payments::set_gateway_details(payment_id, transaction_id, &payment_data, &mut tx).await?;
        let log = NewPaymentLog::new(payment_id, LogAction::GatewayCreated, payment.status, LogOutcome::Applied)
            .with_data(payment_data)
            .with_ip_address(ip_address);
        payment_logs::insert_log(log, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {payment_id} is linked to gateway transaction {transaction_id}");
        Ok(payment)
    }

    async fn record_gateway_failure(
        &self,
        payment_id: &str,
        reason: &str,
        ip_address: Option<String>,
    ) -> Result<Payment, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::lock_payment(payment_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::PaymentNotFound(payment_id.to_string()))?;
        let transition = payment.status.transition_to(PaymentStatusType::Failed);
        let payment = if transition.is_applied() {
            payments::update_status(payment_id, PaymentStatusType::Failed, None, &mut tx).await?
        } else {
            payment
        };
        let log = NewPaymentLog::new(payment_id, LogAction::Error, payment.status, LogOutcome::Error)
            .with_data(json!({ "error": reason }))
            .with_ip_address(ip_address);
        payment_logs::insert_log(log, &mut tx).await?;
        tx.commit().await?;
        warn!("🗃️ Payment {payment_id} could not be created with the gateway and is now {}", payment.status);
        Ok(payment)
    }

    /// Takes the payment lock, then in a single atomic transaction,
    /// * decides whether the requested status is forward progress for the payment,
    /// * if it is, updates the payment and applies any side effects to the order,
    /// * writes a log entry describing the update and its outcome.
    async fn apply_status_update(&self, update: PaymentStatusUpdate) -> Result<TransitionOutcome, PaymentGatewayError> {
        let PaymentStatusUpdate { payment_id, new_status, action, data, ip_address } = update;
        let mut tx = self.pool.begin().await?;
        let payment = payments::lock_payment(&payment_id, &mut tx)
            .await?
            .ok_or_else(|| PaymentGatewayError::PaymentNotFound(payment_id.clone()))?;
        let old_status = payment.status;
        let transition = old_status.transition_to(new_status);
        trace!("🗃️ Payment {payment_id}: {old_status} -> {new_status} is {transition:?}");
        let (payment, order, order_paid) = match transition {
            Transition::Apply => {
                let was_paid = orders::fetch_order_by_id(payment.order_id, &mut tx).await?.map(|o| o.is_paid());
                let payment = payments::update_status(&payment_id, new_status, Some(&data), &mut tx).await?;
                let order = orders::apply_payment_status(payment.order_id, new_status, &mut tx).await?;
                let order_paid = was_paid == Some(false) && order.is_paid();
                (payment, order, order_paid)
            },
            Transition::NoOp | Transition::Reject => {
                let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
                    .await?
                    .ok_or_else(|| PaymentGatewayError::OrderNotFound(format!("id {}", payment.order_id)))?;
                (payment, order, false)
            },
        };
        let log = NewPaymentLog::new(&payment_id, action, new_status, transition.into())
            .with_data(data)
            .with_ip_address(ip_address);
        let log = payment_logs::insert_log(log, &mut tx).await?;
        tx.commit().await?;
        match transition {
            Transition::Apply => info!("🗃️ Payment {payment_id} moved from {old_status} to {new_status} ({action})"),
            Transition::NoOp => debug!("🗃️ Payment {payment_id} is already {new_status}. Nothing to do ({action})"),
            Transition::Reject => {
                warn!("🗃️ Payment {payment_id} cannot move from {old_status} to {new_status}. Ignoring ({action})")
            },
        }
        Ok(TransitionOutcome { payment, order, transition, log, order_paid })
    }

    async fn append_log(&self, log: NewPaymentLog) -> Result<PaymentLog, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let log = payment_logs::insert_log(log, &mut tx).await?;
        tx.commit().await?;
        Ok(log)
    }

    async fn fetch_payment_by_payment_id(&self, payment_id: &str) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_payment_id(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_transaction_id(transaction_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payments_for_order(&self, order_number: &OrderNumber) -> Result<Vec<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_payments_for_order(order_number, &mut conn).await?;
        Ok(payments)
    }

    async fn fetch_logs_for_payment(&self, payment_id: &str) -> Result<Vec<PaymentLog>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let logs = payment_logs::fetch_logs_for_payment(payment_id, &mut conn).await?;
        Ok(logs)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the database URL from the `CPG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Creates a new database API object, creating the database file first if it does not exist yet.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        if !Sqlite::database_exists(url).await? {
            info!("🗃️ Database {url} does not exist. Creating it now.");
            Sqlite::create_database(url).await?;
        }
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new database pool for {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Migrations complete for {}", self.url);
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
