//! # Bazaar server
//!
//! The HTTP surface for the Bazaar marketplace order engine. It is responsible for:
//! * the REST order lifecycle routes (create, cancel, ship, receive, return, reads),
//! * the payment-gateway callback endpoint,
//! * bearer-token authentication,
//! * the background payment-expiry worker.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html).

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod notify;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
