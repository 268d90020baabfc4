//! # Bazaar engine
//!
//! The order lifecycle and payment reconciliation engine for the Bazaar marketplace. This
//! library contains the core logic and is HTTP-framework agnostic.
//!
//! It is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`], [`mod@traits`]). SQLite is the supported
//!    backend. You should never need to touch the database directly; use the public APIs. The
//!    exception is the data types, which are public in [`mod@db_types`].
//! 2. The public API: [`OrderFlowApi`] owns the order state machine (creation, cancellation,
//!    shipping, receipt, expiry), and [`ReconciliationApi`] applies payment-gateway callbacks
//!    exactly once. Both sit on top of the backend traits, keep the read cache consistent, and
//!    publish lifecycle events.
//! 3. The event hook system ([`mod@events`]): subscribe to order lifecycle events (created,
//!    paid, annulled, ...) to enqueue notifications or drive other side effects.
mod api;
mod sqlite;

pub mod cache;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_objects;
pub mod payment_objects;
pub mod test_utils;
pub mod traits;

pub use api::{OrderFlowApi, OrderFlowError, OrderPolicy, ReconciliationApi};
pub use sqlite::{db, SqliteDatabase};
