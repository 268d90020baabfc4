use bazaar_engine::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, Payment, Product, User},
    order_objects::{OrderQueryFilter, Pagination, ShipmentInfo},
    traits::{MarketDbError, MarketplaceDatabase, OrderManagement},
};
use chrono::{DateTime, Utc};
use mockall::mock;

mock! {
    pub Db {}

    impl Clone for Db {
        fn clone(&self) -> Self;
    }

    impl OrderManagement for Db {
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, MarketDbError>;
        async fn fetch_order_by_order_no(&self, order_no: &OrderId) -> Result<Option<Order>, MarketDbError>;
        async fn search_orders(&self, filter: OrderQueryFilter, pagination: Pagination) -> Result<Vec<Order>, MarketDbError>;
        async fn fetch_payment_for_order(&self, order_no: &OrderId) -> Result<Option<Payment>, MarketDbError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, MarketDbError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, MarketDbError>;
    }

    impl MarketplaceDatabase for Db {
        fn url(&self) -> &str;
        async fn create_order_with_reservation(&self, order: NewOrder) -> Result<Order, MarketDbError>;
        async fn cancel_order_with_restock(&self, id: i64) -> Result<Order, MarketDbError>;
        async fn settle_payment(
            &self,
            order_no: &OrderId,
            pay_no: &str,
            paid_at: DateTime<Utc>,
            raw_payload: &str,
        ) -> Result<(Order, Payment), MarketDbError>;
        async fn transition_order(
            &self,
            id: i64,
            expected: OrderStatus,
            target: OrderStatus,
            shipment: Option<ShipmentInfo>,
        ) -> Result<Order, MarketDbError>;
        async fn fetch_overdue_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, MarketDbError>;
    }
}
