use std::{fmt::Display, str::FromStr};

use bazaar_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------       OrderId        --------------------------------------------------------
/// The external order number, as printed on receipts and quoted by the payment gateway.
/// Distinct from the internal row id of the order record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     OrderStatus      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been created and inventory reserved, but no settled payment has arrived.
    PendingPayment,
    /// Payment has settled; the seller has not shipped yet.
    PendingShipment,
    /// The seller has handed the parcel to a carrier.
    Shipped,
    /// The buyer has confirmed receipt. Terminal.
    Completed,
    /// Cancelled by the buyer, an admin, or the payment-expiry sweep. Terminal.
    Cancelled,
    /// Returned by the buyer after shipping. Terminal.
    Returned,
}

impl OrderStatus {
    /// The allowed-transition table. Every state change anywhere in the system is checked
    /// against this adjacency map before any write happens.
    ///
    /// | From            | To                          |
    /// |-----------------|-----------------------------|
    /// | PendingPayment  | PendingShipment, Cancelled  |
    /// | PendingShipment | Shipped, Cancelled          |
    /// | Shipped         | Completed, Returned         |
    /// | Completed       | —                           |
    /// | Cancelled       | —                           |
    /// | Returned        | —                           |
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            PendingPayment => &[PendingShipment, Cancelled],
            PendingShipment => &[Shipped, Cancelled],
            Shipped => &[Completed, Returned],
            Completed | Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::PendingShipment => "PendingShipment",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Returned => "Returned",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingPayment" => Ok(Self::PendingPayment),
            "PendingShipment" => Ok(Self::PendingShipment),
            "Shipped" => Ok(Self::Shipped),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------     PaymentStatus    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Created at checkout; no settled gateway callback has been applied yet.
    Pending,
    /// Settled exactly once. Immutable afterwards.
    Success,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Success => write!(f, "Success"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------        PayType       --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PayType {
    Alipay,
    Wechat,
}

impl Display for PayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayType::Alipay => write!(f, "Alipay"),
            PayType::Wechat => write!(f, "Wechat"),
        }
    }
}

impl FromStr for PayType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Alipay" => Ok(Self::Alipay),
            "Wechat" => Ok(Self::Wechat),
            s => Err(ConversionError(format!("Invalid payment type: {s}"))),
        }
    }
}

//--------------------------------------    ProductStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductStatus {
    OnSale,
    OffSale,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::OnSale => write!(f, "OnSale"),
            ProductStatus::OffSale => write!(f, "OffSale"),
        }
    }
}

//--------------------------------------        Role          --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// A regular platform member. Buyer/seller standing is derived per order, not per user.
    User,
    Admin,
}

/// The authenticated principal attempting an operation. Authorization decisions compare the
/// actor against the buyer and seller recorded on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn user(user_id: i64) -> Self {
        Self { user_id, role: Role::User }
    }

    pub fn admin(user_id: i64) -> Self {
        Self { user_id, role: Role::Admin }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//--------------------------------------        Order         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_no: OrderId,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    /// `unit_price × quantity` at creation time. Never mutated afterwards.
    pub total_amount: Money,
    pub address: String,
    pub pay_type: PayType,
    pub status: OrderStatus,
    pub carrier: Option<String>,
    pub tracking_no: Option<String>,
    /// Unpaid orders past this deadline are cancelled by the expiry sweep.
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn involves(&self, user_id: i64) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

//--------------------------------------       NewOrder       --------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: OrderId,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_amount: Money,
    pub address: String,
    pub pay_type: PayType,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------       Payment        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub order_no: OrderId,
    /// The amount the order was created for. The gateway's declared amount is checked against
    /// this before settlement.
    pub amount: Money,
    /// The gateway transaction id. Set exactly once, at settlement.
    pub pay_no: Option<String>,
    pub status: PaymentStatus,
    pub raw_payload: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Product        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub unit_price: Money,
    pub stock: i64,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------         User         --------------------------------------------------------
/// The slice of the user record the engine consumes. Account management itself lives elsewhere.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub credit_score: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_table_matches_lifecycle() {
        use OrderStatus::*;
        assert!(PendingPayment.can_transition_to(PendingShipment));
        assert!(PendingPayment.can_transition_to(Cancelled));
        assert!(!PendingPayment.can_transition_to(Shipped));
        assert!(PendingShipment.can_transition_to(Shipped));
        assert!(PendingShipment.can_transition_to(Cancelled));
        assert!(!PendingShipment.can_transition_to(Completed));
        assert!(Shipped.can_transition_to(Completed));
        assert!(Shipped.can_transition_to(Returned));
        assert!(!Shipped.can_transition_to(Cancelled));
        for terminal in [Completed, Cancelled, Returned] {
            assert!(terminal.is_terminal());
            for target in [PendingPayment, PendingShipment, Shipped, Completed, Cancelled, Returned] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::PendingShipment,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Returned,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("Paid".parse::<OrderStatus>().is_err());
    }
}
