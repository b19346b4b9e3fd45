//! # Trade Record

use crate::domain::value_objects::TradeType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single execution against an order. Append-only.
///
/// `order_id` and `position_id` are lookup keys only; the referenced records
/// may live in another table or not exist at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade identifier.
    pub id: String,
    /// Account the trade belongs to.
    pub account_id: String,
    /// Order which triggered the trade.
    pub order_id: String,
    /// Position the trade opened or closed.
    pub position_id: String,
    /// Instrument identifier.
    pub instrument: String,
    /// Trade side from the investor's perspective.
    pub trade_type: TradeType,
    /// Execution VWAP price in quoting asset units.
    pub price: Decimal,
    /// Volume in base asset units.
    pub volume: Decimal,
    /// Execution timestamp.
    pub timestamp: DateTime<Utc>,
}
