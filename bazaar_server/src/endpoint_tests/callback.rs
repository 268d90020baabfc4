use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bazaar_common::Secret;
use bazaar_engine::{
    db_types::{OrderStatus, PaymentStatus},
    helpers::callback_signature,
    payment_objects::PaymentCallback,
    traits::MarketDbError,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    endpoint_tests::{
        helpers::{a_payment, an_order, post_request, reconciliation_api, TEST_GATEWAY_SECRET},
        mocks::MockDb,
    },
    routes::PayCallbackRoute,
};

const ORDER_NO: &str = "BZ20240501120000TEST05";

fn signed_body(amount: f64, trade_status: &str) -> serde_json::Value {
    let mut cb = PaymentCallback {
        order_no: ORDER_NO.parse().expect("order no"),
        pay_amount: bazaar_common::Money::from_major_units(amount).expect("amount"),
        sign: String::new(),
        pay_no: "gw-tx-55".to_string(),
        trade_status: trade_status.to_string(),
        pay_time: "2024-05-01 12:30:00".to_string(),
    };
    cb.sign = callback_signature(&cb, &Secret::new(TEST_GATEWAY_SECRET.to_string()));
    serde_json::to_value(&cb).expect("callback json")
}

#[actix_web::test]
async fn callback_with_a_forged_signature_fails_without_touching_the_db() {
    let _ = env_logger::try_init();
    let mut body = signed_body(200.00, "SUCCESS");
    body["sign"] = json!("00".repeat(32));
    // No expectations on the mock: any database call would panic the test.
    let (status, body) = post_request("", "/orders/pay/callback", body, configure_untouched).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fail:invalid signature");
}

#[actix_web::test]
async fn callback_for_an_unknown_order_fails() {
    let _ = env_logger::try_init();
    let (status, body) =
        post_request("", "/orders/pay/callback", signed_body(200.00, "SUCCESS"), configure_unknown_order).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fail:unknown order");
}

#[actix_web::test]
async fn valid_callback_settles_and_returns_the_success_token() {
    let _ = env_logger::try_init();
    let (status, body) =
        post_request("", "/orders/pay/callback", signed_body(200.00, "SUCCESS"), configure_settles).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "success");
}

#[actix_web::test]
async fn duplicate_callback_short_circuits_to_success() {
    let _ = env_logger::try_init();
    // The payment is already settled; `settle_payment` has no expectation and must not run.
    let (status, body) =
        post_request("", "/orders/pay/callback", signed_body(200.00, "SUCCESS"), configure_already_settled).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "success");
}

#[actix_web::test]
async fn amount_mismatch_fails_and_leaves_the_order_payable() {
    let _ = env_logger::try_init();
    let (status, body) =
        post_request("", "/orders/pay/callback", signed_body(180.00, "SUCCESS"), configure_untouchable_settle).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fail:amount mismatch");
}

#[actix_web::test]
async fn non_success_status_is_acknowledged_without_settling() {
    let _ = env_logger::try_init();
    let (status, body) =
        post_request("", "/orders/pay/callback", signed_body(200.00, "WAIT_BUYER_PAY"), configure_untouchable_settle)
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "success");
}

#[actix_web::test]
async fn callback_racing_a_cancellation_fails_without_reviving_the_order() {
    let _ = env_logger::try_init();
    let (status, body) =
        post_request("", "/orders/pay/callback", signed_body(200.00, "SUCCESS"), configure_cancelled_race).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "fail:order is not awaiting payment");
}

//----------------------------------------------   Mock wiring   ----------------------------------------------------

fn configure_untouched(cfg: &mut ServiceConfig) {
    let db = MockDb::new();
    cfg.service(PayCallbackRoute::<MockDb>::new()).app_data(web::Data::new(reconciliation_api(db)));
}

fn configure_unknown_order(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_order_no().returning(|_| Ok(None));
    cfg.service(PayCallbackRoute::<MockDb>::new()).app_data(web::Data::new(reconciliation_api(db)));
}

fn configure_settles(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_order_no()
        .returning(|_| Ok(Some(an_order(5, OrderStatus::PendingPayment))));
    db.expect_fetch_payment_for_order()
        .returning(|order_no| Ok(Some(a_payment(order_no, PaymentStatus::Pending))));
    db.expect_settle_payment().returning(|order_no, pay_no, _, _| {
        let mut order = an_order(5, OrderStatus::PendingShipment);
        order.paid_at = Some(Utc::now());
        let mut payment = a_payment(order_no, PaymentStatus::Success);
        payment.pay_no = Some(pay_no.to_string());
        Ok((order, payment))
    });
    cfg.service(PayCallbackRoute::<MockDb>::new()).app_data(web::Data::new(reconciliation_api(db)));
}

fn configure_already_settled(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_order_no()
        .returning(|_| Ok(Some(an_order(5, OrderStatus::PendingShipment))));
    db.expect_fetch_payment_for_order()
        .returning(|order_no| Ok(Some(a_payment(order_no, PaymentStatus::Success))));
    cfg.service(PayCallbackRoute::<MockDb>::new()).app_data(web::Data::new(reconciliation_api(db)));
}

/// The order and payment exist, but settlement must never be attempted.
fn configure_untouchable_settle(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_order_no()
        .returning(|_| Ok(Some(an_order(5, OrderStatus::PendingPayment))));
    db.expect_fetch_payment_for_order()
        .returning(|order_no| Ok(Some(a_payment(order_no, PaymentStatus::Pending))));
    cfg.service(PayCallbackRoute::<MockDb>::new()).app_data(web::Data::new(reconciliation_api(db)));
}

fn configure_cancelled_race(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order_by_order_no()
        .returning(|_| Ok(Some(an_order(5, OrderStatus::PendingPayment))));
    db.expect_fetch_payment_for_order()
        .returning(|order_no| Ok(Some(a_payment(order_no, PaymentStatus::Pending))));
    db.expect_settle_payment().returning(|_, _, _, _| {
        Err(MarketDbError::TransitionConflict {
            id: 5,
            actual: OrderStatus::Cancelled,
            target: OrderStatus::PendingShipment,
        })
    });
    cfg.service(PayCallbackRoute::<MockDb>::new()).app_data(web::Data::new(reconciliation_api(db)));
}
