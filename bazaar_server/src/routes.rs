//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! Handlers are async: persistence calls block on I/O, and a blocking handler would stall the
//! worker thread it runs on for every other request.
use actix_web::{get, http::header::ContentType, web, HttpResponse, Responder};
use bazaar_engine::{
    order_objects::{CreateOrderRequest, ShipmentInfo},
    payment_objects::PaymentCallback,
    traits::MarketplaceDatabase,
    OrderFlowApi,
    ReconciliationApi,
};
use log::*;

use crate::{auth::JwtClaims, data_objects::OrderListParams, errors::ServerError};

// Actix cannot handle generics in its handler attribute macros, so generic routes are
// registered manually via the `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health   ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout   ----------------------------------------------------
route!(create_order => Post "/orders" impl MarketplaceDatabase);
/// Creates an order for the authenticated buyer. The heavy lifting (eligibility, amount
/// validation, atomic reservation) happens in the engine; this handler only supplies identity.
pub async fn create_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST /orders from user {}", claims.sub);
    let order = api.create_order(claims.sub, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Lifecycle   ----------------------------------------------------
route!(cancel_order => Patch "/orders/{id}/cancel" impl MarketplaceDatabase);
pub async fn cancel_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH /orders/{order_id}/cancel from user {}", claims.sub);
    api.cancel_order(claims.actor(), order_id).await?;
    Ok(HttpResponse::Ok().json(true))
}

route!(ship_order => Patch "/orders/{id}/ship" impl MarketplaceDatabase);
pub async fn ship_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ShipmentInfo>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH /orders/{order_id}/ship from user {}", claims.sub);
    let order = api.ship_order(claims.actor(), order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(receive_order => Patch "/orders/{id}/receive" impl MarketplaceDatabase);
pub async fn receive_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH /orders/{order_id}/receive from user {}", claims.sub);
    let order = api.confirm_receipt(claims.actor(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(return_order => Patch "/orders/{id}/return" impl MarketplaceDatabase);
pub async fn return_order<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ PATCH /orders/{order_id}/return from user {}", claims.sub);
    let order = api.return_order(claims.actor(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Reads   ----------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl MarketplaceDatabase);
pub async fn order_by_id<B: MarketplaceDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET /orders/{order_id} from user {}", claims.sub);
    let order = api.order_detail(claims.actor(), order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(buyer_orders => Get "/orders/buyer/list" impl MarketplaceDatabase);
pub async fn buyer_orders<B: MarketplaceDatabase>(
    claims: JwtClaims,
    params: web::Query<OrderListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET /orders/buyer/list for user {}", claims.sub);
    let list = api.orders_for_buyer(claims.sub, params.status, params.pagination()).await?;
    Ok(HttpResponse::Ok().json(list))
}

route!(seller_orders => Get "/orders/seller/list" impl MarketplaceDatabase);
pub async fn seller_orders<B: MarketplaceDatabase>(
    claims: JwtClaims,
    params: web::Query<OrderListParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET /orders/seller/list for user {}", claims.sub);
    let list = api.orders_for_seller(claims.sub, params.status, params.pagination()).await?;
    Ok(HttpResponse::Ok().json(list))
}

//----------------------------------------------   Gateway webhook   ----------------------------------------------------
route!(pay_callback => Post "/orders/pay/callback" impl MarketplaceDatabase);
/// The payment gateway's settlement webhook. Unauthenticated: the payload carries its own
/// signature, which the reconciliation processor verifies before reading anything. The
/// response is always 200 with the ack string; the gateway retries until it reads the literal
/// success token, so HTTP errors here would only cause redelivery storms.
pub async fn pay_callback<B: MarketplaceDatabase>(
    body: web::Json<PaymentCallback>,
    api: web::Data<ReconciliationApi<B>>,
) -> HttpResponse {
    let cb = body.into_inner();
    trace!("💻️ Payment callback received (pay_no {})", cb.pay_no);
    let ack = api.handle_callback(&cb).await;
    HttpResponse::Ok().content_type(ContentType::plaintext()).body(ack.wire())
}
