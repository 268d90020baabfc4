use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

use crate::db_types::OrderId;

/// Generates an external order number: a timestamp prefix for human scanning plus a random
/// suffix against same-second collisions. Uniqueness is ultimately enforced by the database
/// constraint, not by this generator.
pub fn new_order_no() -> OrderId {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(6).map(char::from).collect();
    OrderId(format!("BZ{stamp}{}", suffix.to_uppercase()))
}
