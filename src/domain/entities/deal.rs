//! # Deals and Commission Parameters
//!
//! A [`Deal`] is the closed round-trip of a position. Each deal owns exactly
//! one [`CommissionParams`] row on the relational store, seeded empty in the
//! same transaction as the deal and filled in later by the commission
//! follow-up.
//!
//! ## Commission state machine
//!
//! ```text
//! Seeded ──calculation ok──▶ Calculated
//!   │
//!   └──calculation failed──▶ Seeded (no retry)
//! ```

use crate::domain::value_objects::{OrderType, OriginatorType, PositionDirection};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed round-trip pairing an opening and a closing trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// Deal identifier.
    pub deal_id: String,
    /// Close time of the deal.
    pub created: DateTime<Utc>,
    /// Account the deal belongs to.
    pub account_id: String,
    /// Instrument identifier.
    pub instrument: String,
    /// Trade that opened the position.
    pub open_trade_id: String,
    /// Type of the opening order.
    pub open_order_type: OrderType,
    /// Volume of the opening order.
    pub open_order_volume: Decimal,
    /// Expected price of the opening order.
    pub open_order_expected_price: Option<Decimal>,
    /// Trade that closed the position.
    pub close_trade_id: String,
    /// Type of the closing order.
    pub close_order_type: OrderType,
    /// Volume of the closing order.
    pub close_order_volume: Decimal,
    /// Expected price of the closing order.
    pub close_order_expected_price: Option<Decimal>,
    /// Direction of the closed exposure.
    pub direction: PositionDirection,
    /// Closed volume.
    pub volume: Decimal,
    /// Who initiated the close.
    pub originator: OriginatorType,
    /// Open price.
    pub open_price: Decimal,
    /// FX rate at open.
    pub open_fx_price: Decimal,
    /// Close price.
    pub close_price: Decimal,
    /// FX rate at close.
    pub close_fx_price: Decimal,
    /// Realized floating profit and loss.
    pub fpl: Decimal,
    /// PnL accrued during the last trading day.
    pub pnl_of_the_last_day: Decimal,
    /// Free-form payload from the producer.
    pub additional_info: Option<String>,
}

/// Progress of the commission calculation of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommissionState {
    /// Seed row written with the deal; calculation pending or failed.
    Seeded,
    /// Calculation completed.
    Calculated,
}

impl fmt::Display for CommissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seeded => write!(f, "Seeded"),
            Self::Calculated => write!(f, "Calculated"),
        }
    }
}

/// Commission attribution inputs of a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionParams {
    /// Deal these parameters belong to.
    pub deal_id: String,
    /// Opening trade, copied by the calculation.
    pub open_trade_id: Option<String>,
    /// Closing trade, copied by the calculation.
    pub close_trade_id: Option<String>,
    /// Opening order volume.
    pub open_order_volume: Option<Decimal>,
    /// Closing order volume.
    pub close_order_volume: Option<Decimal>,
    /// Closed volume.
    pub volume: Option<Decimal>,
    /// When the calculation completed.
    pub calculated_at: Option<DateTime<Utc>>,
}

impl CommissionParams {
    /// Creates the empty seed row of a deal.
    #[must_use]
    pub fn seeded(deal_id: impl Into<String>) -> Self {
        Self {
            deal_id: deal_id.into(),
            open_trade_id: None,
            close_trade_id: None,
            open_order_volume: None,
            close_order_volume: None,
            volume: None,
            calculated_at: None,
        }
    }

    /// Returns the calculation state.
    #[must_use]
    pub fn state(&self) -> CommissionState {
        if self.calculated_at.is_some() {
            CommissionState::Calculated
        } else {
            CommissionState::Seeded
        }
    }
}

/// Roll-up of the deals of one account and instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedDeal {
    /// Account identifier.
    pub account_id: String,
    /// Instrument identifier.
    pub instrument: String,
    /// Number of deals in the group.
    pub deals_count: u64,
    /// Sum of closed volume.
    pub volume: Decimal,
    /// Sum of realized PnL.
    pub fpl: Decimal,
    /// Sum of last-day PnL.
    pub pnl_of_the_last_day: Decimal,
    /// Close time of the most recent deal.
    pub last_deal_created: DateTime<Utc>,
}

impl AggregatedDeal {
    /// Starts a group from its first deal.
    #[must_use]
    pub fn from_deal(deal: &Deal) -> Self {
        Self {
            account_id: deal.account_id.clone(),
            instrument: deal.instrument.clone(),
            deals_count: 1,
            volume: deal.volume,
            fpl: deal.fpl,
            pnl_of_the_last_day: deal.pnl_of_the_last_day,
            last_deal_created: deal.created,
        }
    }

    /// Folds another deal of the same group into the roll-up.
    pub fn absorb(&mut self, deal: &Deal) {
        self.deals_count += 1;
        self.volume += deal.volume;
        self.fpl += deal.fpl;
        self.pnl_of_the_last_day += deal.pnl_of_the_last_day;
        if deal.created > self.last_deal_created {
            self.last_deal_created = deal.created;
        }
    }
}
