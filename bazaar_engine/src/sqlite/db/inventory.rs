use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Product, ProductStatus},
    traits::MarketDbError,
};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

/// Atomically checks and decrements stock. The guard lives in the WHERE clause, so two
/// concurrent reservations can never both succeed on the last unit: whichever UPDATE runs
/// second matches zero rows.
pub async fn reserve_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, MarketDbError> {
    let updated: Option<Product> = sqlx::query_as(
        "UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND status = 'OnSale' AND stock >= $1 RETURNING *",
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(product) => {
            debug!("🧮️ Reserved {quantity} units of product {product_id}; {} remain", product.stock);
            Ok(product)
        },
        // Classify the refusal so the caller can report the right thing.
        None => match fetch_product(product_id, conn).await? {
            None => Err(MarketDbError::ProductNotFound(product_id)),
            Some(p) if p.status != ProductStatus::OnSale => Err(MarketDbError::ProductUnavailable(product_id)),
            Some(_) => Err(MarketDbError::InsufficientStock { product_id, requested: quantity }),
        },
    }
}

/// Reverses a reservation. Exactly-once application is the caller's responsibility: the state
/// machine only invokes this inside the one transaction that moves an order out of
/// `PendingPayment`.
pub async fn restore_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, MarketDbError> {
    let updated: Option<Product> = sqlx::query_as(
        "UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    match updated {
        Some(product) => {
            debug!("🧮️ Restored {quantity} units of product {product_id}; stock is now {}", product.stock);
            Ok(product)
        },
        None => Err(MarketDbError::ProductNotFound(product_id)),
    }
}

/// Inserts a product row. Exercised by tests and seed tooling; the storefront's product
/// management lives outside this engine.
pub async fn insert_product(
    seller_id: i64,
    name: &str,
    unit_price: bazaar_common::Money,
    stock: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO products (seller_id, name, unit_price, stock) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(seller_id)
    .bind(name)
    .bind(unit_price)
    .bind(stock)
    .fetch_one(conn)
    .await
}

pub async fn set_product_status(
    product_id: i64,
    status: ProductStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE products SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status.to_string())
    .bind(product_id)
    .fetch_optional(conn)
    .await
}
