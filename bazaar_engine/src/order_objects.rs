use bazaar_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatus, PayType};

//--------------------------------------  CreateOrderRequest  --------------------------------------------------------
/// A checkout request as submitted by a buyer. The buyer id comes from the authenticated
/// session, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: i64,
    pub quantity: u32,
    /// The total the client believes it is paying. Must match `unit price × quantity` within
    /// 0.01 or the order is rejected before any write.
    pub total_amount: Money,
    pub address: String,
    pub pay_type: PayType,
}

//--------------------------------------     ShipmentInfo     --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentInfo {
    #[serde(rename = "expressCompany")]
    pub carrier: String,
    #[serde(rename = "expressNo")]
    pub tracking_no: String,
}

//--------------------------------------   OrderQueryFilter   --------------------------------------------------------
/// Criteria for list queries. Empty fields are not constrained.
#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub buyer_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderQueryFilter {
    pub fn for_buyer(buyer_id: i64) -> Self {
        Self { buyer_id: Some(buyer_id), ..Default::default() }
    }

    pub fn for_seller(seller_id: i64) -> Self {
        Self { seller_id: Some(seller_id), ..Default::default() }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.buyer_id.is_none() && self.seller_id.is_none() && self.status.is_none()
    }
}

//--------------------------------------      Pagination      --------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: default_page(), page_size: default_page_size() }
    }
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

//--------------------------------------      OrderList       --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderList {
    pub page: u32,
    pub page_size: u32,
    pub orders: Vec<Order>,
}

//--------------------------------------     ExpiryResult     --------------------------------------------------------
/// Outcome of one expiry sweep. Failed cancellations are counted, not propagated, so that one
/// bad order cannot stall the rest of the sweep.
#[derive(Debug, Clone, Default)]
pub struct ExpiryResult {
    pub cancelled: Vec<Order>,
    pub failures: usize,
}

impl ExpiryResult {
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }
}
