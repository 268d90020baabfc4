use crate::{
    db_types::{Order, OrderId, Payment, Product, User},
    order_objects::{OrderQueryFilter, Pagination},
    traits::MarketDbError,
};

/// Read-side access to orders and their collaborators. Kept separate from
/// [`super::MarketplaceDatabase`] so that pure read consumers (list endpoints, the cache layer)
/// can be mocked without the mutation surface.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Fetch an order by its internal row id.
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, MarketDbError>;

    /// Fetch an order by its external order number.
    async fn fetch_order_by_order_no(&self, order_no: &OrderId) -> Result<Option<Order>, MarketDbError>;

    /// Fetch orders matching the filter, newest first, one page at a time.
    async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<Order>, MarketDbError>;

    /// Fetch the payment record belonging to the given order number, if any.
    async fn fetch_payment_for_order(&self, order_no: &OrderId) -> Result<Option<Payment>, MarketDbError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, MarketDbError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, MarketDbError>;
}
