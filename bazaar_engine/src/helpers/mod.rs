mod order_no;
mod signature;

pub use order_no::new_order_no;
pub use signature::{callback_signature, verify_callback_signature};
