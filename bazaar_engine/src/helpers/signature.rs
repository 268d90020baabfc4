//! Gateway callback signing.
//!
//! The gateway signs the callback body with a shared secret: HMAC-SHA256 over the canonical
//! field string, hex encoded. Verification recomputes the digest and compares in constant time,
//! and happens before any state is read, so a forged callback learns nothing about which order
//! numbers exist.
use bazaar_common::Secret;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::payment_objects::PaymentCallback;

type HmacSha256 = Hmac<Sha256>;

/// Canonical string: fields in fixed alphabetical order, `sign` itself excluded.
fn signing_string(cb: &PaymentCallback) -> String {
    format!(
        "orderNo={}&payAmount={}&payNo={}&payTime={}&tradeStatus={}",
        cb.order_no.as_str(),
        cb.pay_amount,
        cb.pay_no,
        cb.pay_time,
        cb.trade_status,
    )
}

pub fn callback_signature(cb: &PaymentCallback, secret: &Secret<String>) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.reveal().as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signing_string(cb).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_callback_signature(cb: &PaymentCallback, secret: &Secret<String>) -> bool {
    let mut mac = match HmacSha256::new_from_slice(secret.reveal().as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(signing_string(cb).as_bytes());
    let provided = match hex::decode(cb.sign.as_bytes()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    mac.verify_slice(&provided).is_ok()
}
