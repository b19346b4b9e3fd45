//! # Position History Record

use crate::domain::value_objects::{PositionCloseReason, PositionDirection};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position snapshot written when the position closes.
///
/// When the close also produced a deal, `deal_id` references it and both
/// records are written together (see
/// [`CompositeWriteCoordinator`](crate::application::services::CompositeWriteCoordinator)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHistory {
    /// Position identifier.
    pub id: String,
    /// Account the position belongs to.
    pub account_id: String,
    /// Instrument identifier.
    pub instrument: String,
    /// Net exposure direction.
    pub direction: PositionDirection,
    /// Position volume in base asset units.
    pub volume: Decimal,
    /// Average open price.
    pub open_price: Decimal,
    /// Close price, once closed.
    pub close_price: Option<Decimal>,
    /// When the position was opened.
    pub open_date: DateTime<Utc>,
    /// When the position was closed.
    pub close_date: Option<DateTime<Utc>>,
    /// Why the position was closed.
    pub close_reason: PositionCloseReason,
    /// Realized profit and loss.
    pub pnl: Decimal,
    /// Deal produced by the close, if any.
    pub deal_id: Option<String>,
    /// When this history row was created.
    pub history_timestamp: DateTime<Utc>,
}
