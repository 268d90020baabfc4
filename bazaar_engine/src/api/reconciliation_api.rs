use std::{fmt::Debug, sync::Arc};

use bazaar_common::Secret;
use log::*;

use crate::{
    cache::{detail_key, list_prefix, Cache, ListOwner},
    db_types::{Order, PaymentStatus},
    events::{EventProducers, OrderPaidEvent},
    helpers::verify_callback_signature,
    payment_objects::{CallbackAck, PaymentCallback},
    traits::{MarketDbError, MarketplaceDatabase, OrderManagement},
};

/// `ReconciliationApi` applies payment-gateway callbacks to the order book, exactly once.
///
/// The gateway redelivers until it reads the literal success token, so this handler must be
/// safe under at-least-once delivery: duplicate callbacks converge on one settlement, a
/// callback racing the expiry sweep cannot resurrect a cancelled order, and signature failures
/// reveal nothing about which order numbers exist.
pub struct ReconciliationApi<B> {
    db: B,
    cache: Arc<dyn Cache>,
    producers: EventProducers,
    gateway_secret: Secret<String>,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B: Clone> Clone for ReconciliationApi<B> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            cache: Arc::clone(&self.cache),
            producers: self.producers.clone(),
            gateway_secret: self.gateway_secret.clone(),
        }
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(db: B, cache: Arc<dyn Cache>, producers: EventProducers, gateway_secret: Secret<String>) -> Self {
        Self { db, cache, producers, gateway_secret }
    }
}

impl<B> ReconciliationApi<B>
where B: MarketplaceDatabase
{
    /// Processes one callback delivery and returns the acknowledgment to put on the wire.
    /// This method never fails outward: internal errors are logged and degrade to a failure
    /// ack, which the gateway treats as a retry signal.
    pub async fn handle_callback(&self, cb: &PaymentCallback) -> CallbackAck {
        // Signature first, before any state is read.
        if !verify_callback_signature(cb, &self.gateway_secret) {
            warn!("💳️ Callback with invalid signature rejected (pay_no {})", cb.pay_no);
            return CallbackAck::failure("invalid signature");
        }
        match self.apply(cb).await {
            Ok(ack) => ack,
            Err(e) => {
                error!("💳️ Callback for order {} failed on the backend: {e}", cb.order_no);
                CallbackAck::failure("internal error")
            },
        }
    }

    async fn apply(&self, cb: &PaymentCallback) -> Result<CallbackAck, MarketDbError> {
        let order = match self.db.fetch_order_by_order_no(&cb.order_no).await? {
            Some(order) => order,
            None => {
                warn!("💳️ Callback for unknown order {} rejected", cb.order_no);
                return Ok(CallbackAck::failure("unknown order"));
            },
        };
        if !cb.is_success() {
            // The gateway is reporting a non-settled state. Acknowledge so it stops
            // redelivering; there is nothing to apply.
            info!("💳️ Order {} reported '{}' by the gateway; no state change", cb.order_no, cb.trade_status);
            return Ok(CallbackAck::Success);
        }
        if let Some(payment) = self.db.fetch_payment_for_order(&cb.order_no).await? {
            if payment.status == PaymentStatus::Success {
                debug!("💳️ Duplicate callback for settled order {}; acknowledging without effect", cb.order_no);
                return Ok(CallbackAck::Success);
            }
        }
        // Settlement is exact to the cent. The rounding slack on the creation-time declared
        // amount does not extend to money actually received.
        if cb.pay_amount != order.total_amount {
            warn!(
                "💳️ Amount mismatch on order {}: declared {} but the order totals {}",
                cb.order_no, cb.pay_amount, order.total_amount
            );
            return Ok(CallbackAck::failure("amount mismatch"));
        }
        let raw = serde_json::to_string(cb).unwrap_or_default();
        let settled = self.db.settle_payment(&cb.order_no, &cb.pay_no, cb.settled_at(), &raw).await;
        match settled {
            Ok((order, payment)) => {
                info!("💳️✅️ Order {} settled by gateway tx {}", order.order_no, cb.pay_no);
                self.invalidate(&order);
                for emitter in &self.producers.order_paid_producer {
                    emitter.publish_event(OrderPaidEvent::new(order.clone(), payment.pay_no.clone().unwrap_or_default()));
                }
                Ok(CallbackAck::Success)
            },
            // A concurrent delivery settled it between our read and the conditional write.
            // The work is done; acknowledge.
            Err(MarketDbError::PaymentAlreadySettled(order_no)) => {
                debug!("💳️ Order {order_no} settled concurrently; acknowledging duplicate");
                Ok(CallbackAck::Success)
            },
            // The order left PendingPayment (typically cancelled by the expiry sweep). The
            // whole settlement transaction rolled back; nothing was re-reserved.
            Err(MarketDbError::TransitionConflict { actual, .. }) => {
                warn!("💳️ Callback for order {} refused: order is {actual}", cb.order_no);
                Ok(CallbackAck::failure("order is not awaiting payment"))
            },
            Err(e) => Err(e),
        }
    }

    fn invalidate(&self, order: &Order) {
        self.cache.delete(&detail_key(order.id));
        self.cache.delete_prefix(&list_prefix(ListOwner::Buyer, order.buyer_id));
        self.cache.delete_prefix(&list_prefix(ListOwner::Seller, order.seller_id));
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
