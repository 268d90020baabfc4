use actix_web::{http::StatusCode, web, web::ServiceConfig};
use bazaar_engine::{
    db_types::{OrderStatus, Role},
    traits::MarketDbError,
};
use chrono::Utc;
use log::debug;
use serde_json::json;

use crate::{
    endpoint_tests::{
        helpers::{
            a_product,
            a_user,
            an_order,
            get_request,
            issue_token,
            orders_api,
            patch_request,
            post_request,
            ADMIN,
            BUYER,
            SELLER,
            STRANGER,
        },
        mocks::MockDb,
    },
    routes::{BuyerOrdersRoute, CancelOrderRoute, CreateOrderRoute, OrderByIdRoute, ShipOrderRoute},
};

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let _ = env_logger::try_init();
    let (status, body) = get_request("", "/orders/buyer/list", configure_lists).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No bearer token"), "got {body}");
}

#[actix_web::test]
async fn garbage_tokens_are_rejected() {
    let _ = env_logger::try_init();
    let mut token = issue_token(BUYER, Role::User);
    token.replace_range(token.len() - 6..token.len(), "AAAAAA");
    debug!("Calling /orders/buyer/list with a tampered token");
    let (status, _) = get_request(&token, "/orders/buyer/list", configure_lists).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_order_returns_the_order_detail() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let body = json!({
        "productId": 7,
        "quantity": 2,
        "totalAmount": 200.00,
        "address": "12 Rook Lane, Castleton",
        "payType": "Alipay"
    });
    let (status, body) = post_request(&token, "/orders", body, configure_create).await;
    assert_eq!(status, StatusCode::OK, "got {body}");
    let order: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(order["status"], "PendingPayment");
    assert_eq!(order["buyerId"], BUYER);
    assert_eq!(order["totalAmount"], 200.0);
}

#[actix_web::test]
async fn create_order_with_wrong_total_is_a_bad_request() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let body = json!({
        "productId": 7,
        "quantity": 2,
        "totalAmount": 150.00,
        "address": "12 Rook Lane, Castleton",
        "payType": "Alipay"
    });
    let (status, body) = post_request(&token, "/orders", body, configure_create).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "got {body}");
    assert!(body.contains("does not match"), "got {body}");
}

#[actix_web::test]
async fn create_order_for_exhausted_stock_is_a_conflict() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let body = json!({
        "productId": 7,
        "quantity": 2,
        "totalAmount": 200.00,
        "address": "12 Rook Lane, Castleton",
        "payType": "Alipay"
    });
    let (status, body) = post_request(&token, "/orders", body, configure_create_exhausted).await;
    assert_eq!(status, StatusCode::CONFLICT, "got {body}");
}

#[actix_web::test]
async fn buyer_can_cancel_their_pending_order() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let (status, body) = patch_request(&token, "/orders/5/cancel", None, configure_cancel).await;
    assert_eq!(status, StatusCode::OK, "got {body}");
    assert_eq!(body, "true");
}

#[actix_web::test]
async fn strangers_cannot_cancel_and_admins_can() {
    let _ = env_logger::try_init();
    let token = issue_token(STRANGER, Role::User);
    let (status, _) = patch_request(&token, "/orders/5/cancel", None, configure_cancel).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = issue_token(ADMIN, Role::Admin);
    let (status, body) = patch_request(&token, "/orders/5/cancel", None, configure_cancel).await;
    assert_eq!(status, StatusCode::OK, "got {body}");
}

#[actix_web::test]
async fn cancelling_a_shipped_order_is_a_conflict() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let (status, body) = patch_request(&token, "/orders/5/cancel", None, configure_cancel_shipped).await;
    assert_eq!(status, StatusCode::CONFLICT, "got {body}");
}

#[actix_web::test]
async fn seller_ships_with_carrier_details() {
    let _ = env_logger::try_init();
    let token = issue_token(SELLER, Role::User);
    let body = json!({ "expressCompany": "SF Express", "expressNo": "SF123456" });
    let (status, body) = patch_request(&token, "/orders/5/ship", Some(body), configure_ship).await;
    assert_eq!(status, StatusCode::OK, "got {body}");
    let order: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(order["status"], "Shipped");
}

#[actix_web::test]
async fn order_detail_is_private_to_its_parties() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let (status, _) = get_request(&token, "/orders/5", configure_detail).await;
    assert_eq!(status, StatusCode::OK);

    let token = issue_token(STRANGER, Role::User);
    let (status, _) = get_request(&token, "/orders/5", configure_detail).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let token = issue_token(ADMIN, Role::Admin);
    let (status, _) = get_request(&token, "/orders/5", configure_detail).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn buyer_list_returns_a_page() {
    let _ = env_logger::try_init();
    let token = issue_token(BUYER, Role::User);
    let (status, body) = get_request(&token, "/orders/buyer/list?status=PendingPayment&page=1", configure_lists).await;
    assert_eq!(status, StatusCode::OK, "got {body}");
    let list: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(list["page"], 1);
    assert_eq!(list["orders"].as_array().expect("orders array").len(), 1);
}

//----------------------------------------------   Mock wiring   ----------------------------------------------------

fn configure_create(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_user().returning(|id| Ok(Some(a_user(id, 80))));
    db.expect_fetch_product().returning(|_| Ok(Some(a_product())));
    db.expect_create_order_with_reservation().returning(|new| {
        let mut order = an_order(1, OrderStatus::PendingPayment);
        order.order_no = new.order_no;
        order.buyer_id = new.buyer_id;
        order.quantity = new.quantity;
        order.total_amount = new.total_amount;
        Ok(order)
    });
    cfg.service(CreateOrderRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}

fn configure_create_exhausted(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_user().returning(|id| Ok(Some(a_user(id, 80))));
    db.expect_fetch_product().returning(|_| Ok(Some(a_product())));
    db.expect_create_order_with_reservation()
        .returning(|new| Err(MarketDbError::InsufficientStock { product_id: new.product_id, requested: new.quantity }));
    cfg.service(CreateOrderRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}

fn configure_cancel(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(an_order(id, OrderStatus::PendingPayment))));
    db.expect_cancel_order_with_restock().returning(|id| {
        let mut order = an_order(id, OrderStatus::Cancelled);
        order.cancelled_at = Some(Utc::now());
        Ok(order)
    });
    cfg.service(CancelOrderRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}

fn configure_cancel_shipped(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(an_order(id, OrderStatus::Shipped))));
    cfg.service(CancelOrderRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}

fn configure_ship(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(an_order(id, OrderStatus::PendingShipment))));
    db.expect_transition_order().returning(|id, _, target, shipment| {
        let mut order = an_order(id, target);
        if let Some(info) = shipment {
            order.carrier = Some(info.carrier);
            order.tracking_no = Some(info.tracking_no);
        }
        order.shipped_at = Some(Utc::now());
        Ok(order)
    });
    cfg.service(ShipOrderRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}

fn configure_detail(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(an_order(id, OrderStatus::PendingPayment))));
    cfg.service(OrderByIdRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}

fn configure_lists(cfg: &mut ServiceConfig) {
    let mut db = MockDb::new();
    db.expect_search_orders()
        .returning(|_, _| Ok(vec![an_order(1, OrderStatus::PendingPayment)]));
    cfg.service(BuyerOrdersRoute::<MockDb>::new()).app_data(web::Data::new(orders_api(db)));
}
