use bazaar_common::Money;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderId, Payment},
    traits::MarketDbError,
};

/// Creates the `Pending` payment record at checkout. The UNIQUE constraint on `order_no` is
/// what makes "at most one payment per order" a database invariant rather than a convention.
pub async fn insert_pending(
    order_no: &OrderId,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketDbError> {
    let payment: Payment =
        sqlx::query_as("INSERT INTO payments (order_no, amount) VALUES ($1, $2) RETURNING *")
            .bind(order_no.as_str())
            .bind(amount)
            .fetch_one(conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(de) if de.is_unique_violation() => {
                    MarketDbError::PaymentAlreadySettled(order_no.clone())
                },
                e => e.into(),
            })?;
    debug!("💳️ Pending payment {} created for order {}", payment.id, payment.order_no);
    Ok(payment)
}

pub async fn fetch_by_order_no(
    order_no: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_no = $1").bind(order_no.as_str()).fetch_optional(conn).await
}

/// Marks the payment settled, iff it is still `Pending`. Zero rows matched means either the
/// record is missing or a concurrent delivery of the same callback already settled it; the
/// caller gets a typed error either way and must roll back.
pub async fn mark_success(
    order_no: &OrderId,
    pay_no: &str,
    paid_at: DateTime<Utc>,
    raw_payload: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketDbError> {
    let updated: Option<Payment> = sqlx::query_as(
        "UPDATE payments SET status = 'Success', pay_no = $1, paid_at = $2, raw_payload = $3, \
         updated_at = CURRENT_TIMESTAMP WHERE order_no = $4 AND status = 'Pending' RETURNING *",
    )
    .bind(pay_no)
    .bind(paid_at)
    .bind(raw_payload)
    .bind(order_no.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(payment) => Ok(payment),
        None => match fetch_by_order_no(order_no, conn).await? {
            Some(_) => Err(MarketDbError::PaymentAlreadySettled(order_no.clone())),
            None => Err(MarketDbError::PaymentNotFound(order_no.clone())),
        },
    }
}
