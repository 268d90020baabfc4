use bazaar_common::Money;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

//--------------------------------------   PaymentCallback    --------------------------------------------------------
/// The settlement notification as delivered by the payment gateway. `sign` covers every other
/// field; nothing in here is trusted until the signature checks out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub order_no: OrderId,
    pub pay_amount: Money,
    pub sign: String,
    /// The gateway's transaction id.
    pub pay_no: String,
    /// Gateway settlement status. Anything other than `SUCCESS` is acknowledged without
    /// touching state.
    pub trade_status: String,
    /// Settlement time as reported by the gateway, `YYYY-MM-DD HH:MM:SS`.
    pub pay_time: String,
}

impl PaymentCallback {
    pub fn is_success(&self) -> bool {
        self.trade_status == "SUCCESS"
    }

    /// The gateway's settlement time, or the current time when the field does not parse.
    /// Settlement must not fail on a cosmetic field.
    pub fn settled_at(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&self.pay_time, "%Y-%m-%d %H:%M:%S")
            .map(|t| t.and_utc())
            .unwrap_or_else(|_| Utc::now())
    }
}

//--------------------------------------     CallbackAck      --------------------------------------------------------
/// The acknowledgment returned to the gateway. Gateways retry delivery until they read the
/// exact success token, so the wire form is a closed contract: `success`, or `fail:<reason>`
/// where the reason text is informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAck {
    Success,
    Failure(String),
}

impl CallbackAck {
    pub fn failure<S: Into<String>>(reason: S) -> Self {
        CallbackAck::Failure(reason.into())
    }

    pub fn wire(&self) -> String {
        match self {
            CallbackAck::Success => "success".to_string(),
            CallbackAck::Failure(reason) => format!("fail:{reason}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallbackAck::Success)
    }
}
