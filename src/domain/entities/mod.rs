//! # Domain Entities
//!
//! History records persisted by the storage layer.
//!
//! ## Records
//!
//! - [`OrderHistory`]: one lifecycle transition of a trading order
//! - [`PositionHistory`]: a closed (or partially closed) position
//! - [`Deal`]: closed round-trip pairing an opening and a closing trade
//! - [`CommissionParams`]: fee attribution inputs of a deal, filled in
//!   asynchronously after the deal commits
//! - [`Trade`]: one execution against an order
//!
//! ## Read Models
//!
//! - [`AggregatedDeal`]: per account/instrument roll-up of deals

pub mod deal;
pub mod order_history;
pub mod position_history;
pub mod trade;

pub use deal::{AggregatedDeal, CommissionParams, CommissionState, Deal};
pub use order_history::OrderHistory;
pub use position_history::PositionHistory;
pub use trade::Trade;
