use std::sync::Arc;

use bazaar_engine::{cache::MemoryCache, db_types::Order, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::{sync::watch, task::JoinHandle};

/// Starts the payment-expiry worker: a periodic sweep that cancels unpaid orders whose
/// deadline has passed, restores their inventory, and drops expired cache entries. Runs until
/// the shutdown signal fires; do not await the returned handle from the request path.
pub fn start_expiry_worker(
    api: OrderFlowApi<SqliteDatabase>,
    cache: Arc<MemoryCache>,
    sweep_interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(sweep_interval);
        info!("🕰️ Payment expiry worker started (sweep every {}s)", sweep_interval.as_secs());
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    cache.purge_expired();
                    match api.expire_overdue_orders().await {
                        Ok(result) => {
                            if result.cancelled_count() > 0 || result.failures > 0 {
                                info!(
                                    "🕰️ Expiry sweep cancelled {} orders ({} failures)",
                                    result.cancelled_count(),
                                    result.failures
                                );
                                debug!("🕰️ Expired orders: {}", order_list(&result.cancelled));
                            }
                        },
                        Err(e) => {
                            error!("🕰️ Error running the payment expiry sweep: {e}");
                        },
                    }
                },
                _ = shutdown.changed() => {
                    info!("🕰️ Payment expiry worker shutting down");
                    break;
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_no: {} buyer: {}", o.id, o.order_no, o.buyer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
