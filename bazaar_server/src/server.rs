use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bazaar_engine::{
    cache::MemoryCache,
    events::{EventHandlers, EventProducers},
    OrderFlowApi,
    ReconciliationApi,
    SqliteDatabase,
};
use log::info;
use tokio::sync::watch;

use crate::{
    auth::TokenIssuer,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    notify::notification_hooks,
    routes::{
        health,
        BuyerOrdersRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        OrderByIdRoute,
        PayCallbackRoute,
        ReceiveOrderRoute,
        ReturnOrderRoute,
        SellerOrdersRoute,
        ShipOrderRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(128, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let cache = Arc::new(MemoryCache::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_api =
        OrderFlowApi::new(db.clone(), cache.clone(), producers.clone(), config.order_policy());
    let reaper = start_expiry_worker(reaper_api, cache.clone(), config.sweep_interval, shutdown_rx);

    let srv = create_server_instance(config, db, cache, producers)?;
    let result = srv.await.map_err(|e| ServerError::InitializeError(e.to_string()));
    // Stop the sweep once the HTTP server has drained.
    let _ = shutdown_tx.send(true);
    let _ = reaper.await;
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    cache: Arc<MemoryCache>,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    info!("🚀️ Starting server on {host}:{port}");
    let srv = HttpServer::new(move || {
        let orders_api =
            OrderFlowApi::new(db.clone(), cache.clone(), producers.clone(), config.order_policy());
        let reconciliation_api = ReconciliationApi::new(
            db.clone(),
            cache.clone(),
            producers.clone(),
            config.gateway_secret.clone(),
        );
        let token_issuer = TokenIssuer::new(&config.auth);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bazaar::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(token_issuer))
            .service(health)
            // The callback and list routes must register before the `{id}` matcher.
            .service(PayCallbackRoute::<SqliteDatabase>::new())
            .service(BuyerOrdersRoute::<SqliteDatabase>::new())
            .service(SellerOrdersRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(ShipOrderRoute::<SqliteDatabase>::new())
            .service(ReceiveOrderRoute::<SqliteDatabase>::new())
            .service(ReturnOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
