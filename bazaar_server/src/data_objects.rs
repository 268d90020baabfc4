use bazaar_engine::{db_types::OrderStatus, order_objects::Pagination};
use serde::Deserialize;

/// Query parameters for the buyer/seller list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl OrderListParams {
    pub fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(default.page).max(1),
            page_size: self.page_size.unwrap_or(default.page_size).clamp(1, 100),
        }
    }
}
