use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::Utc;
use log::*;

use crate::{
    api::OrderFlowError,
    cache::{detail_key, list_key, list_prefix, Cache, ListOwner},
    db_types::{Actor, NewOrder, Order, OrderStatus},
    events::{
        EventProducers,
        OrderAnnulledEvent,
        OrderCompletedEvent,
        OrderCreatedEvent,
        OrderShippedEvent,
    },
    helpers::new_order_no,
    order_objects::{CreateOrderRequest, ExpiryResult, OrderList, OrderQueryFilter, Pagination, ShipmentInfo},
    traits::{MarketDbError, MarketplaceDatabase, OrderManagement},
};

/// Tunables for the order lifecycle.
#[derive(Debug, Clone, Copy)]
pub struct OrderPolicy {
    /// How long a buyer has to pay before the expiry sweep cancels the order.
    pub payment_window: chrono::Duration,
    /// Buyers below this credit score cannot place orders.
    pub min_credit_score: i64,
    /// TTL for cache entries; bounds staleness for entries that escape explicit invalidation.
    pub cache_ttl: Duration,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            payment_window: chrono::Duration::minutes(30),
            min_credit_score: 60,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// `OrderFlowApi` owns the order state machine. Every lifecycle transition in the system goes
/// through one of its methods: load the order, check the allowed-transition table, check actor
/// authorization for the target state, apply the conditional write, then invalidate caches and
/// publish the event. Transitions whose precondition no longer holds are rejected, never
/// silently ignored, which is what makes duplicate client retries and reaper/settlement races
/// safe.
pub struct OrderFlowApi<B> {
    db: B,
    cache: Arc<dyn Cache>,
    producers: EventProducers,
    policy: OrderPolicy,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            cache: Arc::clone(&self.cache),
            producers: self.producers.clone(),
            policy: self.policy,
        }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, cache: Arc<dyn Cache>, producers: EventProducers, policy: OrderPolicy) -> Self {
        Self { db, cache, producers, policy }
    }
}

/// Decides whether `actor` may drive `order` into `target`. Centralised so that every route
/// and the background sweep make the same call with the same rules.
fn authorize(actor: Actor, order: &Order, target: OrderStatus) -> Result<(), OrderFlowError> {
    use OrderStatus::*;
    let allowed = match target {
        Cancelled => actor.user_id == order.buyer_id || actor.is_admin(),
        Shipped => actor.user_id == order.seller_id,
        Completed | Returned => actor.user_id == order.buyer_id,
        // Reached only via settlement or order creation, which no actor requests directly.
        PendingShipment | PendingPayment => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(OrderFlowError::PermissionDenied(format!(
            "User {} may not move order {} to {target}",
            actor.user_id, order.order_no
        )))
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Creates an order for `buyer_id`.
    ///
    /// Validation happens in dependency order, before any write: the buyer must exist and meet
    /// the credit threshold, the product must exist and be on sale, and the declared total
    /// must equal `unit price × quantity` within 0.01. Stock sufficiency is *not* pre-checked
    /// here; the reservation inside [`MarketplaceDatabase::create_order_with_reservation`] is
    /// the only authority on stock, so two concurrent checkouts cannot both take the last
    /// unit.
    pub async fn create_order(&self, buyer_id: i64, req: CreateOrderRequest) -> Result<Order, OrderFlowError> {
        if req.quantity == 0 {
            return Err(OrderFlowError::InvalidQuantity);
        }
        let user = self.db.fetch_user(buyer_id).await?.ok_or(OrderFlowError::UserNotFound(buyer_id))?;
        if user.credit_score < self.policy.min_credit_score {
            debug!("🔄️ User {buyer_id} has credit score {}, below the order threshold", user.credit_score);
            return Err(OrderFlowError::BuyerIneligible(buyer_id));
        }
        let product =
            self.db.fetch_product(req.product_id).await?.ok_or(OrderFlowError::ProductNotFound(req.product_id))?;
        if product.status != crate::db_types::ProductStatus::OnSale {
            return Err(OrderFlowError::ProductUnavailable(product.id));
        }
        let quantity = i64::from(req.quantity);
        let expected = product.unit_price * quantity;
        if !req.total_amount.within_tolerance(expected) {
            debug!("🔄️ Rejecting order for product {}: declared {} expected {expected}", product.id, req.total_amount);
            return Err(OrderFlowError::InvalidAmount { declared: req.total_amount, expected });
        }
        let new_order = NewOrder {
            order_no: new_order_no(),
            buyer_id,
            seller_id: product.seller_id,
            product_id: product.id,
            quantity,
            unit_price: product.unit_price,
            total_amount: expected,
            address: req.address,
            pay_type: req.pay_type,
            expires_at: Utc::now() + self.policy.payment_window,
        };
        let order = self.db.create_order_with_reservation(new_order).await?;
        info!("🔄️📦️ Order {} created for buyer {buyer_id}: {} × product {}", order.order_no, order.quantity, order.product_id);
        self.cache_order(&order);
        self.invalidate_lists(&order);
        for emitter in &self.producers.order_created_producer {
            emitter.publish_event(OrderCreatedEvent::new(order.clone()));
        }
        Ok(order)
    }

    /// Cancels an unpaid order. Permitted only while the order is `PendingPayment`, and only
    /// for the buyer or an admin. Inventory restore rides in the same transaction as the
    /// status flip, so a cancel that loses a race with settlement restores nothing.
    pub async fn cancel_order(&self, actor: Actor, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.load_order(order_id).await?;
        self.check_transition(&order, OrderStatus::Cancelled)?;
        if order.status != OrderStatus::PendingPayment {
            // PendingShipment → Cancelled exists in the table for refund tooling, but the
            // self-service cancel path stops at the payment boundary.
            return Err(OrderFlowError::InvalidStateTransition { from: order.status, to: OrderStatus::Cancelled });
        }
        authorize(actor, &order, OrderStatus::Cancelled)?;
        let cancelled = self.db.cancel_order_with_restock(order.id).await?;
        info!("🔄️❌️ Order {} cancelled by user {}", cancelled.order_no, actor.user_id);
        self.invalidate(&cancelled);
        for emitter in &self.producers.order_annulled_producer {
            emitter.publish_event(OrderAnnulledEvent::new(cancelled.clone()));
        }
        Ok(cancelled)
    }

    /// Marks a paid order as shipped. Seller only.
    pub async fn ship_order(
        &self,
        actor: Actor,
        order_id: i64,
        shipment: ShipmentInfo,
    ) -> Result<Order, OrderFlowError> {
        let order = self.load_order(order_id).await?;
        self.check_transition(&order, OrderStatus::Shipped)?;
        authorize(actor, &order, OrderStatus::Shipped)?;
        let shipped = self
            .db
            .transition_order(order.id, OrderStatus::PendingShipment, OrderStatus::Shipped, Some(shipment.clone()))
            .await?;
        info!("🔄️🚚️ Order {} shipped via {} ({})", shipped.order_no, shipment.carrier, shipment.tracking_no);
        self.invalidate(&shipped);
        for emitter in &self.producers.order_shipped_producer {
            emitter.publish_event(OrderShippedEvent::new(shipped.clone()));
        }
        Ok(shipped)
    }

    /// Buyer confirms receipt; the order reaches its happy-path terminal state.
    pub async fn confirm_receipt(&self, actor: Actor, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.load_order(order_id).await?;
        self.check_transition(&order, OrderStatus::Completed)?;
        authorize(actor, &order, OrderStatus::Completed)?;
        let completed =
            self.db.transition_order(order.id, OrderStatus::Shipped, OrderStatus::Completed, None).await?;
        info!("🔄️✅️ Order {} completed", completed.order_no);
        self.invalidate(&completed);
        for emitter in &self.producers.order_completed_producer {
            emitter.publish_event(OrderCompletedEvent::new(completed.clone()));
        }
        Ok(completed)
    }

    /// Buyer sends a shipped order back. Terminal, like completion, but flagged as annulled
    /// for subscribers.
    pub async fn return_order(&self, actor: Actor, order_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.load_order(order_id).await?;
        self.check_transition(&order, OrderStatus::Returned)?;
        authorize(actor, &order, OrderStatus::Returned)?;
        let returned =
            self.db.transition_order(order.id, OrderStatus::Shipped, OrderStatus::Returned, None).await?;
        info!("🔄️↩️ Order {} returned", returned.order_no);
        self.invalidate(&returned);
        for emitter in &self.producers.order_annulled_producer {
            emitter.publish_event(OrderAnnulledEvent::new(returned.clone()));
        }
        Ok(returned)
    }

    /// Fetches one order, cache-aside. Visible to the buyer, the seller, and admins.
    pub async fn order_detail(&self, actor: Actor, order_id: i64) -> Result<Order, OrderFlowError> {
        let key = detail_key(order_id);
        let order = match self.cache.get(&key).and_then(|json| decode_cached(&key, &json)) {
            Some(order) => order,
            None => {
                let order = self.load_order(order_id).await?;
                self.cache_order(&order);
                order
            },
        };
        if order.involves(actor.user_id) || actor.is_admin() {
            Ok(order)
        } else {
            Err(OrderFlowError::PermissionDenied(format!(
                "User {} is not a party to order {}",
                actor.user_id, order.order_no
            )))
        }
    }

    /// One page of the user's purchase history, cache-aside.
    pub async fn orders_for_buyer(
        &self,
        buyer_id: i64,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<OrderList, OrderFlowError> {
        self.list_orders(ListOwner::Buyer, buyer_id, status, pagination).await
    }

    /// One page of the user's sales history, cache-aside.
    pub async fn orders_for_seller(
        &self,
        seller_id: i64,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<OrderList, OrderFlowError> {
        self.list_orders(ListOwner::Seller, seller_id, status, pagination).await
    }

    async fn list_orders(
        &self,
        owner: ListOwner,
        user_id: i64,
        status: Option<OrderStatus>,
        pagination: Pagination,
    ) -> Result<OrderList, OrderFlowError> {
        let key = list_key(owner, user_id, status, pagination);
        if let Some(list) = self.cache.get(&key).and_then(|json| decode_cached(&key, &json)) {
            return Ok(list);
        }
        let mut filter = match owner {
            ListOwner::Buyer => OrderQueryFilter::for_buyer(user_id),
            ListOwner::Seller => OrderQueryFilter::for_seller(user_id),
        };
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        let orders = self.db.search_orders(filter, pagination).await?;
        let list = OrderList { page: pagination.page, page_size: pagination.page_size, orders };
        if let Ok(json) = serde_json::to_string(&list) {
            self.cache.set(&key, json, self.policy.cache_ttl);
        }
        Ok(list)
    }

    /// Cancels every unpaid order whose payment deadline has passed. Each order is its own
    /// failure-isolated unit of work: an error on one is logged and counted, and the sweep
    /// moves on. Orders that settle concurrently lose their precondition and are skipped.
    pub async fn expire_overdue_orders(&self) -> Result<ExpiryResult, OrderFlowError> {
        let overdue = self.db.fetch_overdue_orders(Utc::now()).await?;
        let mut result = ExpiryResult::default();
        for order in overdue {
            match self.db.cancel_order_with_restock(order.id).await {
                Ok(cancelled) => {
                    self.invalidate(&cancelled);
                    for emitter in &self.producers.order_annulled_producer {
                        emitter.publish_event(OrderAnnulledEvent::new(cancelled.clone()));
                    }
                    result.cancelled.push(cancelled);
                },
                Err(MarketDbError::TransitionConflict { actual, .. }) => {
                    debug!("🔄️ Order {} settled to {actual} while the sweep ran; leaving it alone", order.order_no);
                },
                Err(e) => {
                    error!("🔄️ Could not expire order {}: {e}", order.order_no);
                    result.failures += 1;
                },
            }
        }
        Ok(result)
    }

    async fn load_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.to_string()))
    }

    fn check_transition(&self, order: &Order, target: OrderStatus) -> Result<(), OrderFlowError> {
        if order.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(OrderFlowError::InvalidStateTransition { from: order.status, to: target })
        }
    }

    fn cache_order(&self, order: &Order) {
        if let Ok(json) = serde_json::to_string(order) {
            self.cache.set(&detail_key(order.id), json, self.policy.cache_ttl);
        }
    }

    /// Deletes the detail entry and both parties' list prefixes. Runs after the triggering
    /// write has committed.
    fn invalidate(&self, order: &Order) {
        self.cache.delete(&detail_key(order.id));
        self.invalidate_lists(order);
    }

    fn invalidate_lists(&self, order: &Order) {
        self.cache.delete_prefix(&list_prefix(ListOwner::Buyer, order.buyer_id));
        self.cache.delete_prefix(&list_prefix(ListOwner::Seller, order.seller_id));
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn decode_cached<T: serde::de::DeserializeOwned>(key: &str, json: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("📇️ Discarding undecodable cache entry {key}: {e}");
            None
        },
    }
}
