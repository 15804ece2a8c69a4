use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use payment_engine::db_types::PaymentStatusType;

use super::{
    helpers::*,
    mocks::{MockGateway, MockPaymentDb},
};
use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::AuthConfig,
};

fn status_request(auth: &str) -> TestRequest {
    TestRequest::get().uri(&format!("/api/payments/{PAYMENT_ID}/status")).insert_header(("Authorization", auth))
}

#[actix_web::test]
async fn basic_auth_is_not_accepted() {
    let (status, body) = send(status_request("Basic YWxpY2U6cGFzc3dvcmQ="), MockPaymentDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        r#"{"error":"Authentication Error. Access token is not in the correct format. Expected a Bearer token"}"#
    );
}

#[actix_web::test]
async fn expired_token() {
    let now = Utc::now().timestamp() as u64;
    let claims = JwtClaims { sub: "alice".into(), email: None, is_staff: false, exp: now - 3_600, iat: now - 7_200 };
    let token = TokenIssuer::new(&auth_config()).sign(&claims).unwrap();
    let (status, body) = send(status_request(&format!("Bearer {token}")), MockPaymentDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "{body}");
}

#[actix_web::test]
async fn token_signed_with_another_secret() {
    let other = AuthConfig::new("not-the-secret-this-server-was-configured-with");
    let token = TokenIssuer::new(&other).issue_token("alice", None, true, Some(Duration::from_secs(60))).unwrap();
    let (status, body) = send(status_request(&format!("Bearer {token}")), MockPaymentDb::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("Access token is invalid"), "{body}");
}

#[actix_web::test]
async fn valid_token() {
    let mut db = MockPaymentDb::new();
    db.expect_fetch_payment_by_payment_id()
        .returning(|_| Ok(Some(payment(PaymentStatusType::Failed, None))));
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order("alice"))));
    let token = token_for("alice", false);
    let (status, _) = send(status_request(&format!("Bearer {token}")), db, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
}
