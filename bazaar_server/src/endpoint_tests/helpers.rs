use std::sync::Arc;

use actix_web::{
    http::StatusCode,
    test::{self, TestRequest},
    web::{self, ServiceConfig},
    App,
};
use bazaar_common::{Money, Secret};
use bazaar_engine::{
    cache::MemoryCache,
    db_types::{Order, OrderId, OrderStatus, PayType, Payment, PaymentStatus, Product, ProductStatus, Role, User},
    events::EventProducers,
};
use chrono::{Duration, Utc};

use crate::{
    auth::TokenIssuer,
    config::AuthConfig,
    endpoint_tests::mocks::MockDb,
};

pub const TEST_JWT_SECRET: &str = "endpoint-test-secret-0123456789abcdef";
pub const TEST_GATEWAY_SECRET: &str = "endpoint-test-gateway-secret";

pub fn token_issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) })
}

pub fn issue_token(user_id: i64, role: Role) -> String {
    token_issuer().issue_token(user_id, role, Utc::now() + Duration::days(1)).expect("token issued")
}

pub fn orders_api(db: MockDb) -> bazaar_engine::OrderFlowApi<MockDb> {
    bazaar_engine::OrderFlowApi::new(
        db,
        Arc::new(MemoryCache::new()),
        EventProducers::default(),
        bazaar_engine::OrderPolicy::default(),
    )
}

pub fn reconciliation_api(db: MockDb) -> bazaar_engine::ReconciliationApi<MockDb> {
    bazaar_engine::ReconciliationApi::new(
        db,
        Arc::new(MemoryCache::new()),
        EventProducers::default(),
        Secret::new(TEST_GATEWAY_SECRET.to_string()),
    )
}

async fn execute(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = test::init_service(
        App::new().app_data(web::Data::new(token_issuer())).configure(configure),
    )
    .await;
    let res = test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8(test::read_body(res).await.to_vec()).expect("utf8 body");
    (status, body)
}

pub async fn get_request(token: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let mut req = TestRequest::get().uri(path);
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    execute(req, configure).await
}

pub async fn post_request(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    execute(req, configure).await
}

pub async fn patch_request(
    token: &str,
    path: &str,
    body: Option<serde_json::Value>,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::patch().uri(path);
    if let Some(body) = body {
        req = req.set_json(body);
    }
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    execute(req, configure).await
}

//----------------------------------------------   Fixtures   ----------------------------------------------------
pub const BUYER: i64 = 11;
pub const SELLER: i64 = 22;
pub const ADMIN: i64 = 33;
pub const STRANGER: i64 = 44;
pub const PRODUCT: i64 = 7;

pub fn a_user(id: i64, credit_score: i64) -> User {
    User { id, username: format!("user_{id}"), credit_score, is_admin: false, created_at: Utc::now() }
}

pub fn a_product() -> Product {
    Product {
        id: PRODUCT,
        seller_id: SELLER,
        name: "Walnut chessboard".to_string(),
        unit_price: Money::from_cents(10_000),
        stock: 5,
        status: ProductStatus::OnSale,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn an_order(id: i64, status: OrderStatus) -> Order {
    let now = Utc::now();
    Order {
        id,
        order_no: OrderId(format!("BZ20240501120000TEST{id:02}")),
        buyer_id: BUYER,
        seller_id: SELLER,
        product_id: PRODUCT,
        quantity: 2,
        unit_price: Money::from_cents(10_000),
        total_amount: Money::from_cents(20_000),
        address: "12 Rook Lane, Castleton".to_string(),
        pay_type: PayType::Alipay,
        status,
        carrier: None,
        tracking_no: None,
        expires_at: now + Duration::minutes(30),
        paid_at: None,
        shipped_at: None,
        received_at: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn a_payment(order_no: &OrderId, status: PaymentStatus) -> Payment {
    Payment {
        id: 1,
        order_no: order_no.clone(),
        amount: Money::from_cents(20_000),
        pay_no: None,
        status,
        raw_payload: None,
        paid_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
