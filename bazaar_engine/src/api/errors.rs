use bazaar_common::Money;
use thiserror::Error;

use crate::{db_types::OrderStatus, traits::MarketDbError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Declared amount {declared} does not match the expected total {expected}")]
    InvalidAmount { declared: Money, expected: Money },
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("User {0} does not meet the credit requirement for placing orders")]
    BuyerIneligible(i64),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Insufficient stock for product {0}")]
    InsufficientStock(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("Cannot transition an order from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },
    #[error("Permission denied. {0}")]
    PermissionDenied(String),
    #[error("Storage backend error: {0}")]
    DatabaseError(String),
}

impl From<MarketDbError> for OrderFlowError {
    fn from(e: MarketDbError) -> Self {
        match e {
            MarketDbError::ProductNotFound(id) => Self::ProductNotFound(id),
            MarketDbError::ProductUnavailable(id) => Self::ProductUnavailable(id),
            MarketDbError::InsufficientStock { product_id, .. } => Self::InsufficientStock(product_id),
            MarketDbError::OrderNotFound(order_no) => Self::OrderNotFound(order_no.to_string()),
            MarketDbError::OrderIdNotFound(id) => Self::OrderNotFound(id.to_string()),
            MarketDbError::UserNotFound(id) => Self::UserNotFound(id),
            MarketDbError::TransitionConflict { actual, target, .. } => {
                Self::InvalidStateTransition { from: actual, to: target }
            },
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
