use actix_web::{http::StatusCode, test::TestRequest};
use nowpayments_tools::NowPaymentsConfig;
use payment_engine::{
    db_types::{LogAction, PaymentStatusType},
    traits::{GatewayError, GatewayPaymentReport},
};
use serde_json::{json, Value};

use super::{
    helpers::*,
    mocks::{MockGateway, MockPaymentDb},
};

fn ipn_body(status: &str) -> Value {
    json!({
        "payment_id": 5077125051u64,
        "payment_status": status,
        "pay_address": "bc1qexampleaddress",
        "price_amount": 100,
        "price_currency": "usd",
        "order_id": "ORD-AB12CD34",
    })
}

fn ipn_request(body: &Value, signature: Option<&str>) -> TestRequest {
    let mut req = TestRequest::post()
        .uri("/api/payments/ipn")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(serde_json::to_vec(body).unwrap());
    if let Some(sig) = signature {
        req = req.insert_header(("x-nowpayments-sig", sig.to_string()));
    }
    req
}

fn report_from(body: &Value, status: PaymentStatusType) -> GatewayPaymentReport {
    GatewayPaymentReport {
        transaction_id: TRANSACTION_ID.to_string(),
        provider_status: body["payment_status"].as_str().unwrap_or_default().to_string(),
        status,
        order_number: body["order_id"].as_str().map(String::from),
        raw: body.clone(),
    }
}

fn trusting_gateway(status: PaymentStatusType) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_verify_signature().withf(|_, sig| sig == "good-signature").returning(|_, _| true);
    gateway.expect_parse_notification().returning(move |body| Ok(report_from(body, status)));
    gateway
}

fn db_with_pending_payment() -> MockPaymentDb {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_transaction_id()
        .withf(|txid| txid == TRANSACTION_ID)
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("alice"))));
    db
}

#[actix_web::test]
async fn confirmed_ipn() {
    let mut db = db_with_pending_payment();
    db.expect_apply_status_update()
        .withf(|u| {
            u.payment_id == PAYMENT_ID &&
                u.new_status == PaymentStatusType::Completed &&
                u.action == LogAction::Webhook &&
                u.ip_address.as_deref() == Some(PEER_ADDR) &&
                u.data["payment_status"] == "confirmed"
        })
        .times(1)
        .returning(|u| {
            Ok(outcome(PaymentStatusType::Pending, u.new_status, u.action, paid_order("alice"), u.data.clone()))
        });
    let req = ipn_request(&ipn_body("confirmed"), Some("good-signature"));
    let (status, body) = send(req, db, trusting_gateway(PaymentStatusType::Completed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success"}"#);
}

#[actix_web::test]
async fn ipn_arrives_at_the_registered_callback_url() {
    let config = NowPaymentsConfig { site_url: "https://shop.example.com/".into(), ..Default::default() };
    let callback = config.ipn_callback_url();
    let path = callback.strip_prefix("https://shop.example.com").unwrap();
    let mut db = db_with_pending_payment();
    db.expect_apply_status_update().times(1).returning(|u| {
        Ok(outcome(PaymentStatusType::Pending, u.new_status, u.action, paid_order("alice"), u.data.clone()))
    });
    let req = ipn_request(&ipn_body("confirmed"), Some("good-signature")).uri(path);
    let (status, body) = send(req, db, trusting_gateway(PaymentStatusType::Completed)).await;
    assert_eq!(status, StatusCode::OK, "{path}: {body}");
    assert_eq!(body, r#"{"status":"success"}"#);
}

#[actix_web::test]
async fn duplicate_ipn_is_acknowledged() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_transaction_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Completed, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(paid_order("alice"))));
    db.expect_apply_status_update()
        .times(1)
        .returning(|_| Ok(no_op_outcome(PaymentStatusType::Completed, paid_order("alice"))));
    let req = ipn_request(&ipn_body("finished"), Some("good-signature"));
    let (status, body) = send(req, db, trusting_gateway(PaymentStatusType::Completed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success"}"#);
}

#[actix_web::test]
async fn ipn_without_a_signature() {
    let mut gateway = MockGateway::new();
    gateway.expect_verify_signature().never();
    let req = ipn_request(&ipn_body("finished"), None);
    let (status, body) = send(req, MockPaymentDb::new(), gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. Missing signature"}"#);
}

#[actix_web::test]
async fn ipn_with_a_bad_signature() {
    let mut gateway = MockGateway::new();
    gateway.expect_verify_signature().times(1).returning(|_, _| false);
    gateway.expect_parse_notification().never();
    // No database expectations: any database call fails the test
    let req = ipn_request(&ipn_body("finished"), Some("forged"));
    let (status, body) = send(req, MockPaymentDb::new(), gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid signature"}"#);
}

#[actix_web::test]
async fn ipn_with_a_malformed_body() {
    let mut gateway = MockGateway::new();
    gateway.expect_verify_signature().never();
    let req = TestRequest::post()
        .uri("/api/payments/ipn")
        .insert_header(("x-nowpayments-sig", "good-signature"))
        .set_payload("payment_id=1&payment_status=finished");
    let (status, body) = send(req, MockPaymentDb::new(), gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Invalid request. Invalid JSON."#), "{body}");
}

#[actix_web::test]
async fn ipn_that_cannot_be_parsed() {
    let mut gateway = MockGateway::new();
    gateway.expect_verify_signature().returning(|_, _| true);
    gateway
        .expect_parse_notification()
        .returning(|_| Err(GatewayError::InvalidNotification("missing field `payment_id`".into())));
    let req = ipn_request(&json!({"payment_status": "finished"}), Some("good-signature"));
    let (status, body) = send(req, MockPaymentDb::new(), gateway).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing field"), "{body}");
}

#[actix_web::test]
async fn ipn_for_an_unknown_payment() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_transaction_id().returning(|_| Ok(None));
    db.expect_apply_status_update().never();
    let req = ipn_request(&ipn_body("finished"), Some("good-signature"));
    let (status, body) = send(req, db, trusting_gateway(PaymentStatusType::Completed)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Payment 5077125051 not found"}"#);
}

#[actix_web::test]
async fn ipn_for_the_wrong_order() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_transaction_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("alice"))));
    db.expect_apply_status_update().never();
    let mut body = ipn_body("finished");
    body["order_id"] = json!("ORD-99999999");
    let req = ipn_request(&body, Some("good-signature"));
    let (status, body) = send(req, db, trusting_gateway(PaymentStatusType::Completed)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Order ORD-99999999 not found"}"#);
}
