//! # Clearing Engine
//!
//! Deal clearing backend: tracks deals between a client, a dealership, and
//! optionally a bank, records typed monetary obligations ("orders") within a
//! deal, and reduces them to net settlement positions through multilateral
//! netting.
//!
//! ## Entry points
//!
//! [`netting::compute_net_settlements`] is the core computation: orders in,
//! net settlements out. [`ClearingEngine`] wraps it together with the
//! obligation store and input validation; [`api::create_router`] exposes the
//! whole thing over REST.
//!
//! ## Example
//!
//! ```rust
//! use clearing_engine::netting::compute_net_settlements;
//! use clearing_engine::{DealId, Order, OrderId, OrderStatus};
//! use rust_decimal::Decimal;
//!
//! let now = chrono::Utc::now();
//! // One purchase: the client owes the dealership 100.
//! let orders = vec![Order {
//!     order_id: OrderId(1),
//!     deal_id: DealId(1),
//!     order_type_id: 1,
//!     amount: Decimal::from(100),
//!     status: OrderStatus::Pending,
//!     bank_id: None,
//!     created_at: now,
//!     updated_at: now,
//! }];
//! let settlements = compute_net_settlements(DealId(1), &orders).unwrap();
//! assert_eq!(settlements.len(), 2);
//! assert_eq!(settlements[0].amount, Decimal::from(100));  // client owes
//! assert_eq!(settlements[1].amount, Decimal::from(-100)); // dealership is owed
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod netting;
pub mod persistence;
pub mod store;
pub mod types;

pub use auth::{AuthConfig, AuthUser, Role};
pub use config::Config;
pub use engine::ClearingEngine;
pub use error::ClearingError;
pub use netting::{build_obligation_matrix, compute_net_settlements, ObligationMatrix, Participant};
pub use store::{MemoryStore, StoreSnapshot};
pub use types::{
    BankId, ClientId, Deal, DealId, NewDeal, NewOrder, NewSettlement, Order, OrderId, OrderStatus,
    OrderType, Settlement, SettlementId, SettlementStatus,
};
