#![allow(dead_code)]
//! Shared scaffolding for engine integration tests: a throwaway database seeded with a buyer,
//! a seller, an admin, and one product with 5 units in stock.
use std::sync::Arc;

use bazaar_common::{Money, Secret};
use bazaar_engine::{
    cache::MemoryCache,
    db,
    db_types::OrderId,
    events::{EventProducer, EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    helpers::callback_signature,
    order_objects::CreateOrderRequest,
    payment_objects::PaymentCallback,
    test_utils::prepare_env::{prepare_test_db, random_db_path},
    OrderFlowApi,
    OrderPolicy,
    ReconciliationApi,
    SqliteDatabase,
};
use tokio::sync::mpsc;

pub const GATEWAY_SECRET: &str = "test-gateway-secret";

pub struct TestRig {
    pub db: SqliteDatabase,
    pub cache: Arc<MemoryCache>,
    pub flow: OrderFlowApi<SqliteDatabase>,
    pub recon: ReconciliationApi<SqliteDatabase>,
    pub paid_events: mpsc::Receiver<OrderPaidEvent>,
    pub annulled_events: mpsc::Receiver<OrderAnnulledEvent>,
    pub buyer: i64,
    pub seller: i64,
    pub admin: i64,
    pub low_credit_buyer: i64,
    pub product: i64,
}

pub async fn setup() -> TestRig {
    setup_with_policy(OrderPolicy::default()).await
}

pub async fn setup_with_policy(policy: OrderPolicy) -> TestRig {
    let _ = env_logger::try_init();
    let url = random_db_path();
    let db = prepare_test_db(&url).await;

    let mut conn = db.pool().acquire().await.expect("no connection");
    let buyer = db::users::insert_user("alice", 80, false, &mut conn).await.expect("seed buyer").id;
    let seller = db::users::insert_user("bob", 75, false, &mut conn).await.expect("seed seller").id;
    let admin = db::users::insert_user("root", 100, true, &mut conn).await.expect("seed admin").id;
    let low_credit_buyer = db::users::insert_user("mallory", 10, false, &mut conn).await.expect("seed user").id;
    let product = db::inventory::insert_product(seller, "Walnut chessboard", Money::from_cents(10_000), 5, &mut conn)
        .await
        .expect("seed product")
        .id;
    drop(conn);

    let cache = Arc::new(MemoryCache::new());
    let (paid_tx, paid_events) = mpsc::channel(16);
    let (annulled_tx, annulled_events) = mpsc::channel(16);
    let mut producers = EventProducers::default();
    producers.order_paid_producer.push(EventProducer::new(paid_tx));
    producers.order_annulled_producer.push(EventProducer::new(annulled_tx));

    let flow = OrderFlowApi::new(db.clone(), cache.clone(), producers.clone(), policy);
    let recon =
        ReconciliationApi::new(db.clone(), cache.clone(), producers, Secret::new(GATEWAY_SECRET.to_string()));
    TestRig { db, cache, flow, recon, paid_events, annulled_events, buyer, seller, admin, low_credit_buyer, product }
}

pub fn create_req(product_id: i64, quantity: u32, total: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        product_id,
        quantity,
        total_amount: Money::from_major_units(total).expect("valid amount"),
        address: "12 Rook Lane, Castleton".to_string(),
        pay_type: bazaar_engine::db_types::PayType::Alipay,
    }
}

/// A correctly signed success callback for the given order number and amount.
pub fn signed_callback(order_no: &OrderId, amount: f64, pay_no: &str) -> PaymentCallback {
    let mut cb = PaymentCallback {
        order_no: order_no.clone(),
        pay_amount: Money::from_major_units(amount).expect("valid amount"),
        sign: String::new(),
        pay_no: pay_no.to_string(),
        trade_status: "SUCCESS".to_string(),
        pay_time: "2024-05-01 12:30:00".to_string(),
    };
    cb.sign = callback_signature(&cb, &Secret::new(GATEWAY_SECRET.to_string()));
    cb
}

pub async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    use bazaar_engine::traits::OrderManagement;
    db.fetch_product(product_id).await.expect("fetch product").expect("product exists").stock
}
