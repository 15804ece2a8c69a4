#![allow(dead_code)]
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;
use nowpayments_tools::{calculate_signature, verify_signature, GatewayPaymentStatus, IpnNotification};
use payment_engine::{
    db_types::{Money, NewOrder, Order, OrderNumber},
    events::EventProducers,
    traits::{GatewayError, GatewayPaymentReport, GatewayPaymentRequest, PaymentGateway},
    PaymentFlowApi,
    PaymentGatewayDatabase,
    SqliteDatabase,
};
use serde_json::{json, Value};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const IPN_SECRET: &str = "test-ipn-secret";

pub type TestApi = PaymentFlowApi<SqliteDatabase, FakeGateway>;

pub async fn setup() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = format!("sqlite://{}/cpg_engine_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>());
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
    db.migrate().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub async fn setup_api() -> (TestApi, FakeGateway) {
    setup_api_with_producers(EventProducers::default()).await
}

pub async fn setup_api_with_producers(producers: EventProducers) -> (TestApi, FakeGateway) {
    let db = setup().await;
    let gateway = FakeGateway::default();
    (PaymentFlowApi::new(db, gateway.clone(), producers), gateway)
}

pub async fn tear_down(api: TestApi) {
    let mut db = api.db().clone();
    let url = db.url().to_string();
    drop(api);
    let _ = db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not drop {url}: {e}");
    }
}

pub fn order_number(s: &str) -> OrderNumber {
    OrderNumber::from(s.to_string())
}

/// Inserts an order for 100.00 USD (90.00 + 12.50 tax - 2.50 discount) owned by `user_id`.
pub async fn insert_order(db: &SqliteDatabase, number: &str, user_id: &str) -> Order {
    let order = NewOrder::new(order_number(number), user_id.to_string(), Money::from_major(90))
        .with_tax(Money::from_cents(1_250))
        .with_discount(Money::from_cents(250));
    db.insert_order(order).await.expect("Error inserting order")
}

/// Produces an IPN body, and its signature, as NOWPayments would send it.
pub fn signed_ipn(transaction_id: &str, status: &str, order_number: Option<&str>) -> (Vec<u8>, String) {
    let mut body = json!({
        "payment_id": transaction_id.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(transaction_id)),
        "payment_status": status,
        "pay_address": "bc1qfakeaddress",
        "price_amount": 100,
        "price_currency": "usd",
        "actually_paid": 0.0017,
    });
    if let Some(o) = order_number {
        body["order_id"] = Value::from(o);
    }
    let sig = calculate_signature(IPN_SECRET, &body).expect("Could not sign IPN");
    (serde_json::to_vec(&body).expect("Could not serialise IPN"), sig)
}

#[derive(Default)]
struct FakeState {
    statuses: HashMap<String, String>,
    next_tx: u64,
    fail_create: bool,
    fail_status: bool,
    create_calls: usize,
    status_calls: usize,
}

/// An in-memory payment provider. Every payment it creates starts out `waiting`, and tests move it along with
/// [`FakeGateway::set_status`].
#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGateway {
    pub fn set_status(&self, transaction_id: &str, status: &str) {
        let mut state = self.state.lock().unwrap();
        state.statuses.insert(transaction_id.to_string(), status.to_string());
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub fn fail_status(&self, fail: bool) {
        self.state.lock().unwrap().fail_status = fail;
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    fn report(transaction_id: &str, status: &str, raw: Value) -> GatewayPaymentReport {
        let provider = GatewayPaymentStatus::from(status.to_string());
        GatewayPaymentReport {
            transaction_id: transaction_id.to_string(),
            provider_status: provider.to_string(),
            status: provider.to_local(),
            order_number: raw["order_id"].as_str().map(String::from),
            raw,
        }
    }
}

impl PaymentGateway for FakeGateway {
    async fn create_payment(&self, request: GatewayPaymentRequest) -> Result<GatewayPaymentReport, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.create_calls += 1;
        if state.fail_create {
            return Err(GatewayError::Unavailable("Query failed. Error 500. Internal error".into()));
        }
        state.next_tx += 1;
        let transaction_id = (5_000_000_000 + state.next_tx).to_string();
        state.statuses.insert(transaction_id.clone(), "waiting".into());
        let raw = json!({
            "payment_id": transaction_id,
            "payment_status": "waiting",
            "pay_address": "bc1qfakeaddress",
            "price_amount": request.amount.to_string(),
            "price_currency": request.currency.to_lowercase(),
            "order_id": request.order_number.as_str(),
            "custom_payment_id": request.payment_id,
        });
        Ok(Self::report(&transaction_id, "waiting", raw))
    }

    async fn check_status(&self, transaction_id: &str) -> Result<GatewayPaymentReport, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        if state.fail_status {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        let status = state
            .statuses
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| GatewayError::Unavailable(format!("Query failed. Error 404. {transaction_id}")))?;
        let raw = json!({ "payment_id": transaction_id, "payment_status": status });
        Ok(Self::report(transaction_id, &status, raw))
    }

    fn verify_signature(&self, raw_body: &[u8], signature: &str) -> bool {
        match serde_json::from_slice::<Value>(raw_body) {
            Ok(body) => verify_signature(IPN_SECRET, &body, signature),
            Err(_) => false,
        }
    }

    fn parse_notification(&self, body: &Value) -> Result<GatewayPaymentReport, GatewayError> {
        let ipn = IpnNotification::from_json(body).map_err(|e| GatewayError::InvalidNotification(e.to_string()))?;
        Ok(GatewayPaymentReport {
            transaction_id: ipn.payment_id,
            provider_status: ipn.payment_status.to_string(),
            status: ipn.payment_status.to_local(),
            order_number: ipn.order_id,
            raw: body.clone(),
        })
    }
}
