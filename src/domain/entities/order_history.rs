//! # Order History Record
//!
//! One row per lifecycle transition of a trading order.
//!
//! History is append-only: a transition never updates an existing row, it
//! inserts a new one, and the store assigns it a fresh write-order key.

use crate::domain::value_objects::{
    OrderDirection, OrderStatus, OrderType, OrderUpdateType, OriginatorType,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single order lifecycle transition.
///
/// `parent_order_id` links protective orders (stop loss, take profit) to the
/// order they protect. Links are set by the producer and never form cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistory {
    /// Order identifier; shared by every transition of the same order.
    pub id: String,
    /// Account the order belongs to.
    pub account_id: String,
    /// Instrument (asset pair) identifier, e.g. `BTCUSD`.
    pub instrument: String,
    /// Order this one is attached to, if any.
    pub parent_order_id: Option<String>,
    /// Position opened or closed by the order, if any.
    pub position_id: Option<String>,
    /// Order direction.
    pub direction: OrderDirection,
    /// Order type.
    pub order_type: OrderType,
    /// Status after this transition.
    pub status: OrderStatus,
    /// Who initiated the order.
    pub originator: OriginatorType,
    /// Transition that produced this row.
    pub update_type: OrderUpdateType,
    /// Order volume in base asset units.
    pub volume: Decimal,
    /// Requested price for pending orders.
    pub expected_open_price: Option<Decimal>,
    /// Execution price once executed.
    pub execution_price: Option<Decimal>,
    /// Realized profit and loss reported by the producer.
    pub pnl: Decimal,
    /// When the order was created.
    pub created_timestamp: DateTime<Utc>,
    /// When this transition happened.
    pub modified_timestamp: DateTime<Utc>,
    /// Free-form comment.
    pub comment: Option<String>,
}

impl OrderHistory {
    /// Returns true if this row is attached to `parent_id`.
    #[must_use]
    pub fn is_child_of(&self, parent_id: &str) -> bool {
        self.parent_order_id.as_deref() == Some(parent_id)
    }
}
