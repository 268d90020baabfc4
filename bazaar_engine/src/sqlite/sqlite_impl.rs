//! `SqliteDatabase` is the concrete SQLite implementation of the marketplace backend traits.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{create_schema, inventory, new_pool, orders, payments, users};
use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, Payment, Product, User},
    order_objects::{OrderQueryFilter, Pagination, ShipmentInfo},
    traits::{MarketDbError, MarketplaceDatabase, OrderManagement},
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

impl SqliteDatabase {
    /// Connects to the database at `url` and applies the schema.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MarketDbError> {
        let pool = new_pool(url, max_connections).await?;
        create_schema(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_order_no(&self, order_no: &OrderId) -> Result<Option<Order>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_no(order_no, &mut conn).await?)
    }

    async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<Order>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(filter, pagination, &mut conn).await?)
    }

    async fn fetch_payment_for_order(&self, order_no: &OrderId) -> Result<Option<Payment>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_by_order_no(order_no, &mut conn).await?)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(inventory::fetch_product(product_id, &mut conn).await?)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(user_id, &mut conn).await?)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_with_reservation(&self, order: NewOrder) -> Result<Order, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        inventory::reserve_stock(order.product_id, order.quantity, &mut tx).await?;
        let saved = orders::insert_order(order, &mut tx).await?;
        payments::insert_pending(&saved.order_no, saved.total_amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} persisted with {} units of product {} reserved", saved.order_no, saved.quantity, saved.product_id);
        Ok(saved)
    }

    async fn cancel_order_with_restock(&self, id: i64) -> Result<Order, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        // The conditional transition is the gate: if it fails, the restore below never runs,
        // so stock can only ever be given back once per order.
        let order =
            orders::transition(id, OrderStatus::PendingPayment, OrderStatus::Cancelled, None, &mut tx).await?;
        inventory::restore_stock(order.product_id, order.quantity, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} cancelled and {} units of product {} restored", order.order_no, order.quantity, order.product_id);
        Ok(order)
    }

    async fn settle_payment(
        &self,
        order_no: &OrderId,
        pay_no: &str,
        paid_at: DateTime<Utc>,
        raw_payload: &str,
    ) -> Result<(Order, Payment), MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::mark_success(order_no, pay_no, paid_at, raw_payload, &mut tx).await?;
        let order = orders::transition_by_order_no(
            order_no,
            OrderStatus::PendingPayment,
            OrderStatus::PendingShipment,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️ Payment {pay_no} settled; order {order_no} awaiting shipment");
        Ok((order, payment))
    }

    async fn transition_order(
        &self,
        id: i64,
        expected: OrderStatus,
        target: OrderStatus,
        shipment: Option<ShipmentInfo>,
    ) -> Result<Order, MarketDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::transition(id, expected, target, shipment.as_ref(), &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_overdue_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, MarketDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_overdue(now, &mut conn).await?)
    }

    async fn close(&mut self) -> Result<(), MarketDbError> {
        self.pool.close().await;
        Ok(())
    }
}
