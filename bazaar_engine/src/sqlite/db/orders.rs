use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus},
    order_objects::{OrderQueryFilter, Pagination, ShipmentInfo},
    traits::MarketDbError,
};

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, MarketDbError> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_no,
                buyer_id,
                seller_id,
                product_id,
                quantity,
                unit_price,
                total_amount,
                address,
                pay_type,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order.order_no.clone())
    .bind(order.buyer_id)
    .bind(order.seller_id)
    .bind(order.product_id)
    .bind(order.quantity)
    .bind(order.unit_price)
    .bind(order.total_amount)
    .bind(order.address)
    .bind(order.pay_type.to_string())
    .bind(order.expires_at)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(de) if de.is_unique_violation() => MarketDbError::OrderAlreadyExists(order.order_no),
        e => e.into(),
    })?;
    debug!("📝️ Order {} inserted with id {}", inserted.order_no, inserted.id);
    Ok(inserted)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_order_no(
    order_no: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_no = $1").bind(order_no.as_str()).fetch_optional(conn).await
}

/// Fetches one page of orders matching the filter, newest first.
pub async fn search_orders(
    filter: OrderQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(buyer_id) = filter.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(seller_id) = filter.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    if let Some(status) = filter.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(pagination.limit());
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Applies a conditional status transition. The UPDATE only matches when the order is still in
/// `expected` status; zero rows means somebody else got there first (or the order is gone), and
/// the caller receives a typed conflict instead of a silent overwrite.
pub async fn transition(
    id: i64,
    expected: OrderStatus,
    target: OrderStatus,
    shipment: Option<&ShipmentInfo>,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketDbError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(target.to_string());
    match target {
        OrderStatus::PendingShipment => {
            builder.push(", paid_at = CURRENT_TIMESTAMP");
        },
        OrderStatus::Shipped => {
            builder.push(", shipped_at = CURRENT_TIMESTAMP");
            if let Some(info) = shipment {
                builder.push(", carrier = ");
                builder.push_bind(info.carrier.as_str());
                builder.push(", tracking_no = ");
                builder.push_bind(info.tracking_no.as_str());
            }
        },
        OrderStatus::Completed => {
            builder.push(", received_at = CURRENT_TIMESTAMP");
        },
        OrderStatus::Cancelled | OrderStatus::Returned => {
            builder.push(", cancelled_at = CURRENT_TIMESTAMP");
        },
        OrderStatus::PendingPayment => {},
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status = ");
    builder.push_bind(expected.to_string());
    builder.push(" RETURNING *");
    let updated: Option<Order> = builder.build_query_as().fetch_optional(&mut *conn).await?;
    match updated {
        Some(order) => Ok(order),
        None => match fetch_order(id, conn).await? {
            Some(order) => Err(MarketDbError::TransitionConflict { id, actual: order.status, target }),
            None => Err(MarketDbError::OrderIdNotFound(id)),
        },
    }
}

/// Same conditional transition, keyed by the external order number. Used by settlement, where
/// the gateway only knows the order number.
pub async fn transition_by_order_no(
    order_no: &OrderId,
    expected: OrderStatus,
    target: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketDbError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = $1, paid_at = CURRENT_TIMESTAMP \
         WHERE order_no = $2 AND status = $3 RETURNING *",
    )
    .bind(target.to_string())
    .bind(order_no.as_str())
    .bind(expected.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(order),
        None => match fetch_order_by_order_no(order_no, conn).await? {
            Some(order) => {
                Err(MarketDbError::TransitionConflict { id: order.id, actual: order.status, target })
            },
            None => Err(MarketDbError::OrderNotFound(order_no.clone())),
        },
    }
}

/// All unpaid orders whose payment deadline has passed as of `now`.
pub async fn fetch_overdue(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders WHERE status = 'PendingPayment' AND unixepoch(expires_at) <= unixepoch($1) \
         ORDER BY expires_at ASC",
    )
    .bind(now)
    .fetch_all(conn)
    .await
}
