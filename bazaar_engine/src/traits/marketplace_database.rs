use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, Payment},
    order_objects::ShipmentInfo,
    traits::OrderManagement,
};

/// The mutation surface a backend must provide for the order lifecycle.
///
/// Every method that touches more than one row executes as a single transaction, and every
/// status change is a conditional write on the expected current status. A precondition that no
/// longer holds (a concurrent cancel, a duplicate callback) fails the whole call with
/// [`MarketDbError::TransitionConflict`] and leaves no partial state behind.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + OrderManagement {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    /// Atomically reserves stock, persists the order in `PendingPayment`, and creates the
    /// `Pending` payment record. Reservation is a conditional decrement: the product must be
    /// on sale with at least `order.quantity` in stock, or the transaction is rolled back.
    async fn create_order_with_reservation(&self, order: NewOrder) -> Result<Order, MarketDbError>;

    /// Atomically transitions the order to `Cancelled` (iff it is currently `PendingPayment`)
    /// and restores the reserved quantity to the product's stock. Used by explicit
    /// cancellation and the expiry sweep alike; the status precondition is what makes the
    /// restore apply at most once per order.
    async fn cancel_order_with_restock(&self, id: i64) -> Result<Order, MarketDbError>;

    /// Atomically settles the payment for `order_no` (iff it is still `Pending`) and advances
    /// the order `PendingPayment → PendingShipment`. Either precondition failing rolls the
    /// whole transaction back; in particular a cancelled order is never resurrected and its
    /// inventory is not re-reserved.
    async fn settle_payment(
        &self,
        order_no: &OrderId,
        pay_no: &str,
        paid_at: DateTime<Utc>,
        raw_payload: &str,
    ) -> Result<(Order, Payment), MarketDbError>;

    /// Applies a single conditional status transition with its side timestamps (`shipped_at`
    /// plus carrier/tracking for `Shipped`, `received_at` for `Completed`, `cancelled_at` for
    /// `Returned`). The caller is responsible for having checked the transition table and
    /// actor authorization; this method enforces only the `expected` current status.
    async fn transition_order(
        &self,
        id: i64,
        expected: OrderStatus,
        target: OrderStatus,
        shipment: Option<ShipmentInfo>,
    ) -> Result<Order, MarketDbError>;

    /// All `PendingPayment` orders whose payment deadline has passed as of `now`.
    async fn fetch_overdue_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, MarketDbError>;

    /// Closes the connection pool.
    async fn close(&mut self) -> Result<(), MarketDbError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketDbError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order with internal id {0} does not exist")]
    OrderIdNotFound(i64),
    #[error("Cannot insert order {0}, it already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not on sale")]
    ProductUnavailable(i64),
    #[error("Insufficient stock for product {product_id}: {requested} requested")]
    InsufficientStock { product_id: i64, requested: i64 },
    #[error("No payment record exists for order {0}")]
    PaymentNotFound(OrderId),
    #[error("The payment for order {0} has already been settled")]
    PaymentAlreadySettled(OrderId),
    #[error("Order {id} is {actual}; transition to {target} refused")]
    TransitionConflict { id: i64, actual: OrderStatus, target: OrderStatus },
    #[error("User {0} does not exist")]
    UserNotFound(i64),
}

impl From<sqlx::Error> for MarketDbError {
    fn from(e: sqlx::Error) -> Self {
        MarketDbError::DatabaseError(e.to_string())
    }
}
