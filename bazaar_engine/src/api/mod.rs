mod errors;
mod order_flow_api;
mod reconciliation_api;

pub use errors::OrderFlowError;
pub use order_flow_api::{OrderFlowApi, OrderPolicy};
pub use reconciliation_api::ReconciliationApi;
