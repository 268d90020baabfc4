use std::fmt::Write;

use crate::{db_types::OrderStatus, order_objects::Pagination};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOwner {
    Buyer,
    Seller,
}

impl ListOwner {
    fn as_str(&self) -> &'static str {
        match self {
            ListOwner::Buyer => "buyer",
            ListOwner::Seller => "seller",
        }
    }
}

pub fn detail_key(order_id: i64) -> String {
    format!("order:{order_id}")
}

/// Prefix under which every list page for one side of one user lives. Invalidation deletes the
/// whole prefix, so it does not need to know which filters or pages were ever cached.
pub fn list_prefix(owner: ListOwner, user_id: i64) -> String {
    format!("orders:{}:{user_id}:", owner.as_str())
}

pub fn list_key(owner: ListOwner, user_id: i64, status: Option<OrderStatus>, pagination: Pagination) -> String {
    let mut key = list_prefix(owner, user_id);
    match status {
        Some(s) => {
            let _ = write!(key, "{s}");
        },
        None => key.push_str("all"),
    }
    let _ = write!(key, ":{}:{}", pagination.page, pagination.page_size);
    key
}
