//! Domain types and IDs for the clearing module.
//!
//! All identifiers are newtype wrappers. [`Deal`], [`Order`], and [`Settlement`]
//! define the entities; [`OrderType`] is the small fixed enumeration of
//! obligation kinds the netting engine understands.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Deal identifier (caller-assigned at creation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DealId(pub u64);

/// Order identifier (internal, store-assigned).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct OrderId(pub u64);

/// Client identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClientId(pub u64);

/// Bank identifier. Present on an order when a bank participates in the obligation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BankId(pub u64);

/// Monetary settlement identifier. Zero for ephemeral (unsaved) settlements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SettlementId(pub u64);

/// Order kind: which directed obligation(s) an order contributes to the matrix.
///
/// Wire orders carry a raw `order_type_id` so out-of-enumeration values are
/// representable; the netting engine rejects them via [`OrderType::from_id`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderType {
    /// Client owes the dealership the order amount.
    Purchase,
    /// Credit financing: the bank disburses the financed amount to the
    /// client. A credit without a bank reference posts nothing.
    Credit,
    /// Trade-in: the dealership owes the client.
    TradeIn,
}

impl OrderType {
    /// Maps a raw `order_type_id` to a known order type. `None` for unknown ids.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(OrderType::Purchase),
            2 => Some(OrderType::Credit),
            3 => Some(OrderType::TradeIn),
            _ => None,
        }
    }

    /// Raw wire id for this order type.
    pub fn id(&self) -> u32 {
        match self {
            OrderType::Purchase => 1,
            OrderType::Credit => 2,
            OrderType::TradeIn => 3,
        }
    }
}

/// Order lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Settlement lifecycle status. Persisted settlements start pending and move
/// to executed or cancelled exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Executed,
    Cancelled,
}

/// A deal: groups orders and settlements for one client engagement.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Deal {
    pub deal_id: DealId,
    pub dealership_id: u64,
    pub manager_id: u64,
    pub client_id: ClientId,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a deal. The deal id is caller-assigned.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NewDeal {
    pub deal_id: DealId,
    pub dealership_id: u64,
    pub manager_id: u64,
    pub client_id: ClientId,
}

/// A typed monetary obligation within a deal.
///
/// Immutable from the netting engine's point of view: the engine only reads
/// `order_type_id`, `amount`, and `bank_id`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub deal_id: DealId,
    pub order_type_id: u32,
    pub amount: Decimal,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<BankId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create or replace an order.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NewOrder {
    pub deal_id: DealId,
    pub order_type_id: u32,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<BankId>,
}

/// A net payment obligation between clearing participants.
///
/// Sign convention: positive `amount` means the participant owes, negative
/// means the participant is owed. Ephemeral settlements produced by the
/// netting engine have `settlement_id` 0; persisted ones get a real id.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Settlement {
    pub settlement_id: SettlementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    pub amount: Decimal,
    pub status: SettlementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<BankId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to persist a settlement directly (outside the netting path).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct NewSettlement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<DealId>,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<BankId>,
}
