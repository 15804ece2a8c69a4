use actix_web::{http::StatusCode, test::TestRequest};
use payment_engine::{
    db_types::{LogAction, LogOutcome, Order, OrderPaymentStatus, OrderStatusType, PaymentStatusType},
    traits::GatewayError,
};
use serde_json::{json, Value};

use super::{
    helpers::*,
    mocks::{MockGateway, MockPaymentDb},
};

fn create_request(order_id: &str, user_id: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/payments/create")
        .insert_header(bearer(user_id, false))
        .set_json(json!({ "order_id": order_id }))
}

#[actix_web::test]
async fn health_check() {
    let (status, body) = send(TestRequest::get().uri("/health"), MockPaymentDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_payment() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order_by_order_number()
        .withf(|o| o.as_str() == "ORD-AB12CD34")
        .returning(|_| Ok(Some(order("alice"))));
    db.expect_create_payment_for_order()
        .withf(|p, _, ip| p.order_number.as_str() == "ORD-AB12CD34" && ip.as_deref() == Some(PEER_ADDR))
        .times(1)
        .returning(|_, _, _| Ok((order("alice"), payment(PaymentStatusType::Pending, None))));
    db.expect_record_gateway_created()
        .withf(|pid, txid, _, _| pid == PAYMENT_ID && txid == TRANSACTION_ID)
        .times(1)
        .returning(|_, txid, _, _| Ok(payment(PaymentStatusType::Pending, Some(txid))));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_payment()
        .withf(|r| r.amount.cents() == 10_000 && r.currency == "USD" && r.customer_email.is_some())
        .times(1)
        .returning(|_| Ok(report("waiting", PaymentStatusType::Pending)));

    let (status, body) = send(create_request("ORD-AB12CD34", "alice"), db, gateway).await;
    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["payment_id"], PAYMENT_ID);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["gateway_data"]["payment_id"], TRANSACTION_ID);
    assert_eq!(body["gateway_data"]["pay_address"], "bc1qexampleaddress");
}

#[actix_web::test]
async fn create_payment_without_a_token() {
    let req = TestRequest::post().uri("/api/payments/create").set_json(json!({ "order_id": "ORD-AB12CD34" }));
    let (status, body) = send(req, MockPaymentDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No access token was provided."}"#);
}

#[actix_web::test]
async fn create_payment_for_another_users_order() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order_by_order_number().returning(|_| Ok(Some(order("bob"))));
    db.expect_create_payment_for_order().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment().never();
    let (status, body) = send(create_request("ORD-AB12CD34", "alice"), db, gateway).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Unauthorized"}"#);
}

#[actix_web::test]
async fn create_payment_for_an_unknown_order() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order_by_order_number().returning(|_| Ok(None));
    let (status, body) = send(create_request("ORD-00000000", "alice"), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Order ORD-00000000 not found"}"#);
}

#[actix_web::test]
async fn create_payment_without_an_order_id() {
    let (status, body) = send(create_request("  ", "alice"), MockPaymentDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("order_id is required"), "{body}");
}

#[actix_web::test]
async fn create_payment_for_a_paid_order() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order_by_order_number().returning(|_| Ok(Some(paid_order("alice"))));
    db.expect_create_payment_for_order().never();
    let (status, body) = send(create_request("ORD-AB12CD34", "alice"), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Order ORD-AB12CD34 is already paid"}"#);
}

#[actix_web::test]
async fn create_payment_when_the_gateway_is_down() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order_by_order_number().returning(|_| Ok(Some(order("alice"))));
    db.expect_create_payment_for_order()
        .returning(|_, _, _| Ok((order("alice"), payment(PaymentStatusType::Pending, None))));
    db.expect_record_gateway_created().never();
    db.expect_record_gateway_failure()
        .withf(|pid, reason, _| pid == PAYMENT_ID && reason == "request timed out")
        .times(1)
        .returning(|_, _, _| Ok(payment(PaymentStatusType::Failed, None)));
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment().returning(|_| Err(GatewayError::Unavailable("request timed out".into())));
    let (status, body) = send(create_request("ORD-AB12CD34", "alice"), db, gateway).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, r#"{"error":"The payment gateway is unavailable. request timed out"}"#);
}

#[actix_web::test]
async fn status_of_a_terminal_payment_does_not_poll() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Completed, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(paid_order("alice"))));
    db.expect_apply_status_update().never();
    db.expect_append_log().never();
    let mut gateway = MockGateway::new();
    gateway.expect_check_status().never();
    let req = TestRequest::get().uri(&format!("/api/payments/{PAYMENT_ID}/status")).insert_header(bearer("alice", false));
    let (status, body) = send(req, db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        r#"{"payment_id":"PAY-0123456789AB","status":"completed","amount":"100.00","currency":"USD","created_at":"2024-06-01T10:00:00Z","updated_at":"2024-06-01T10:00:00Z"}"#
    );
}

#[actix_web::test]
async fn status_of_a_pending_payment_polls_the_gateway() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("alice"))));
    db.expect_apply_status_update()
        .withf(|u| u.new_status == PaymentStatusType::Completed && u.action == LogAction::StatusCheck)
        .times(1)
        .returning(|u| {
            Ok(outcome(PaymentStatusType::Pending, u.new_status, u.action, paid_order("alice"), u.data.clone()))
        });
    let mut gateway = MockGateway::new();
    gateway
        .expect_check_status()
        .withf(|txid| txid == TRANSACTION_ID)
        .times(1)
        .returning(|_| Ok(report("confirmed", PaymentStatusType::Completed)));
    let req = TestRequest::get().uri(&format!("/api/payments/{PAYMENT_ID}/status")).insert_header(bearer("alice", false));
    let (status, body) = send(req, db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "completed");
}

#[actix_web::test]
async fn status_when_the_gateway_is_down() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("alice"))));
    db.expect_apply_status_update().never();
    db.expect_append_log()
        .withf(|l| l.action == LogAction::Error && l.outcome == LogOutcome::Error)
        .times(1)
        .returning(|l| Ok(log_entry(l.action, l.status, l.outcome, l.data.clone())));
    let mut gateway = MockGateway::new();
    gateway.expect_check_status().returning(|_| Err(GatewayError::Unavailable("connection refused".into())));
    let req = TestRequest::get().uri(&format!("/api/payments/{PAYMENT_ID}/status")).insert_header(bearer("alice", false));
    let (status, body) = send(req, db, gateway).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "pending");
}

#[actix_web::test]
async fn status_of_someone_elses_payment() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("bob"))));
    let mut gateway = MockGateway::new();
    gateway.expect_check_status().never();
    let req = TestRequest::get().uri(&format!("/api/payments/{PAYMENT_ID}/status")).insert_header(bearer("alice", false));
    let (status, _) = send(req, db, gateway).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn status_of_an_unknown_payment() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/payments/PAY-FFFFFFFFFFFF/status").insert_header(bearer("alice", false));
    let (status, body) = send(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"Payment PAY-FFFFFFFFFFFF not found"}"#);
}

#[actix_web::test]
async fn staff_can_read_the_audit_log() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("bob"))));
    db.expect_fetch_logs_for_payment().withf(|pid| pid == PAYMENT_ID).returning(|_| {
        Ok(vec![log_entry(
            LogAction::Create,
            PaymentStatusType::Pending,
            LogOutcome::Applied,
            json!({"order_id": "ORD-AB12CD34"}),
        )])
    });
    let req = TestRequest::get().uri(&format!("/api/payments/{PAYMENT_ID}/logs")).insert_header(bearer("support", true));
    let (status, body) = send(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body[0]["action"], "create");
    assert_eq!(body[0]["outcome"], "applied");
    assert_eq!(body[0]["data"]["order_id"], "ORD-AB12CD34");
    assert_eq!(body[0]["ip_address"], PEER_ADDR);
}

#[actix_web::test]
async fn payments_for_an_order() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_order_by_order_number().returning(|_| Ok(Some(order("alice"))));
    db.expect_fetch_payments_for_order().returning(|_| {
        Ok(vec![payment(PaymentStatusType::Failed, None), payment(PaymentStatusType::Pending, Some(TRANSACTION_ID))])
    });
    let req = TestRequest::get().uri("/api/orders/ORD-AB12CD34/payments").insert_header(bearer("alice", false));
    let (status, body) = send(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[1]["transaction_id"], TRANSACTION_ID);
}

#[actix_web::test]
async fn only_staff_can_refund() {
    let mut db = MockPaymentDb::new();
    db.expect_apply_status_update().never();
    let req = TestRequest::post()
        .uri(&format!("/api/admin/payments/{PAYMENT_ID}/refund"))
        .insert_header(bearer("alice", false));
    let (status, _) = send(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn refund_a_completed_payment() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Completed, Some(TRANSACTION_ID)))));
    db.expect_apply_status_update()
        .withf(|u| {
            u.new_status == PaymentStatusType::Refunded &&
                u.action == LogAction::Refund &&
                u.data["reason"] == "Customer request"
        })
        .times(1)
        .returning(|u| {
            let order = Order { status: OrderStatusType::Refunded, payment_status: OrderPaymentStatus::Refunded, ..paid_order("alice") };
            Ok(outcome(PaymentStatusType::Completed, u.new_status, u.action, order, u.data.clone()))
        });
    let req = TestRequest::post()
        .uri(&format!("/api/admin/payments/{PAYMENT_ID}/refund"))
        .insert_header(bearer("support", true))
        .set_json(json!({ "reason": "Customer request" }));
    let (status, body) = send(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "refunded");
}

#[actix_web::test]
async fn refund_a_pending_payment() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Pending, Some(TRANSACTION_ID)))));
    db.expect_apply_status_update().never();
    let req = TestRequest::post()
        .uri(&format!("/api/admin/payments/{PAYMENT_ID}/refund"))
        .insert_header(bearer("support", true));
    let (status, body) = send(req, db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"A payment cannot move from pending to refunded"}"#);
}
