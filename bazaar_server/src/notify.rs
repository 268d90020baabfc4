//! Notification enqueue hooks.
//!
//! Delivery (mail, push, in-app) belongs to the notification service; this server's contract
//! ends at enqueueing. Each hook runs detached from the request that triggered it, so a slow
//! or failing enqueue can never fail an order operation.
use bazaar_engine::events::EventHooks;
use log::info;

pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_created(|ev| {
        Box::pin(async move {
            enqueue(ev.order.buyer_id, format!("Order {} created, awaiting payment", ev.order.order_no)).await;
        })
    });
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            enqueue(ev.order.buyer_id, format!("Payment for order {} received", ev.order.order_no)).await;
            enqueue(ev.order.seller_id, format!("Order {} is paid and ready to ship", ev.order.order_no)).await;
        })
    });
    hooks.on_order_annulled(|ev| {
        Box::pin(async move {
            enqueue(ev.order.buyer_id, format!("Order {} is {}", ev.order.order_no, ev.status)).await;
            enqueue(ev.order.seller_id, format!("Order {} is {}", ev.order.order_no, ev.status)).await;
        })
    });
    hooks.on_order_shipped(|ev| {
        Box::pin(async move {
            enqueue(ev.order.buyer_id, format!("Order {} has shipped", ev.order.order_no)).await;
        })
    });
    hooks.on_order_completed(|ev| {
        Box::pin(async move {
            enqueue(ev.order.seller_id, format!("Order {} was received by the buyer", ev.order.order_no)).await;
        })
    });
    hooks
}

/// Hands the message to the notification service. Stubbed to a log line here; the queue lives
/// outside this repository.
async fn enqueue(user_id: i64, message: String) {
    info!("📨️ Notification queued for user {user_id}: {message}");
}
