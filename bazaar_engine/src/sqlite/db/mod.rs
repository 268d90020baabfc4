//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, maintained as simple functions (rather than stateful
//! structs) that accept a `&mut SqliteConnection`. Callers obtain a connection from a pool, or
//! open a transaction and pass `&mut *tx`, so any of these calls can be composed atomically.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod inventory;
pub mod orders;
pub mod payments;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/bazaar.db";

pub fn db_url() -> String {
    let result = env::var("BZR_DATABASE_URL").unwrap_or_else(|_| {
        info!("BZR_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Applies the schema. Every statement is idempotent, so this runs unconditionally at startup.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), SqlxError> {
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        order_no    TEXT NOT NULL UNIQUE,
        buyer_id    INTEGER NOT NULL,
        seller_id   INTEGER NOT NULL,
        product_id  INTEGER NOT NULL,
        quantity    INTEGER NOT NULL CHECK (quantity > 0),
        unit_price  INTEGER NOT NULL,
        total_amount INTEGER NOT NULL,
        address     TEXT NOT NULL,
        pay_type    TEXT NOT NULL,
        status      TEXT NOT NULL DEFAULT 'PendingPayment',
        carrier     TEXT,
        tracking_no TEXT,
        expires_at  DATETIME NOT NULL,
        paid_at     DATETIME,
        shipped_at  DATETIME,
        received_at DATETIME,
        cancelled_at DATETIME,
        created_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_buyer ON orders (buyer_id, status);",
    "CREATE INDEX IF NOT EXISTS idx_orders_seller ON orders (seller_id, status);",
    "CREATE INDEX IF NOT EXISTS idx_orders_expiry ON orders (status, expires_at);",
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        order_no    TEXT NOT NULL UNIQUE,
        amount      INTEGER NOT NULL,
        pay_no      TEXT,
        status      TEXT NOT NULL DEFAULT 'Pending',
        raw_payload TEXT,
        paid_at     DATETIME,
        created_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        seller_id   INTEGER NOT NULL,
        name        TEXT NOT NULL,
        unit_price  INTEGER NOT NULL,
        stock       INTEGER NOT NULL CHECK (stock >= 0),
        status      TEXT NOT NULL DEFAULT 'OnSale',
        created_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at  DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        username     TEXT NOT NULL UNIQUE,
        credit_score INTEGER NOT NULL DEFAULT 100,
        is_admin     BOOLEAN NOT NULL DEFAULT 0,
        created_at   DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    "#,
];
