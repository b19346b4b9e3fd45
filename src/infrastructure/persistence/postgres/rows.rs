//! Row types for relational queries and their conversion to domain records.
//!
//! Enumerations are stored as their variant names; a value that does not
//! parse back is reported as a serialization error.

use crate::domain::entities::{AggregatedDeal, CommissionParams, Deal, OrderHistory, PositionHistory, Trade};
use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Selected columns of `orders_change_history`.
pub const ORDER_COLUMNS: &str = "id, account_id, instrument, parent_order_id, position_id, \
    direction, order_type, status, originator, update_type, volume, expected_open_price, \
    execution_price, pnl, created_timestamp, modified_timestamp, comment";

/// Selected columns of `positions_history`.
pub const POSITION_COLUMNS: &str = "id, account_id, instrument, direction, volume, open_price, \
    close_price, open_date, close_date, close_reason, pnl, deal_id, history_timestamp";

/// Selected columns of `deals`.
pub const DEAL_COLUMNS: &str = "deal_id, created, account_id, instrument, open_trade_id, \
    open_order_type, open_order_volume, open_order_expected_price, close_trade_id, \
    close_order_type, close_order_volume, close_order_expected_price, direction, volume, \
    originator, open_price, open_fx_price, close_price, close_fx_price, fpl, \
    pnl_of_the_last_day, additional_info";

/// Selected columns of `trades`.
pub const TRADE_COLUMNS: &str =
    "id, account_id, order_id, position_id, instrument, trade_type, price, volume, trade_timestamp";

fn parse<T>(column: &str, value: &str) -> RepositoryResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::serialization(format!("column {column}: {e}")))
}

/// Row of `orders_change_history`.
#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    id: String,
    account_id: String,
    instrument: String,
    parent_order_id: Option<String>,
    position_id: Option<String>,
    direction: String,
    order_type: String,
    status: String,
    originator: String,
    update_type: String,
    volume: Decimal,
    expected_open_price: Option<Decimal>,
    execution_price: Option<Decimal>,
    pnl: Decimal,
    created_timestamp: DateTime<Utc>,
    modified_timestamp: DateTime<Utc>,
    comment: Option<String>,
}

impl OrderRow {
    /// Converts the row into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` for an unknown enumeration value.
    pub fn try_into_order(self) -> RepositoryResult<OrderHistory> {
        Ok(OrderHistory {
            direction: parse("direction", &self.direction)?,
            order_type: parse("order_type", &self.order_type)?,
            status: parse("status", &self.status)?,
            originator: parse("originator", &self.originator)?,
            update_type: parse("update_type", &self.update_type)?,
            id: self.id,
            account_id: self.account_id,
            instrument: self.instrument,
            parent_order_id: self.parent_order_id,
            position_id: self.position_id,
            volume: self.volume,
            expected_open_price: self.expected_open_price,
            execution_price: self.execution_price,
            pnl: self.pnl,
            created_timestamp: self.created_timestamp,
            modified_timestamp: self.modified_timestamp,
            comment: self.comment,
        })
    }
}

/// Row of `positions_history`.
#[derive(Debug, sqlx::FromRow)]
pub struct PositionRow {
    id: String,
    account_id: String,
    instrument: String,
    direction: String,
    volume: Decimal,
    open_price: Decimal,
    close_price: Option<Decimal>,
    open_date: DateTime<Utc>,
    close_date: Option<DateTime<Utc>>,
    close_reason: String,
    pnl: Decimal,
    deal_id: Option<String>,
    history_timestamp: DateTime<Utc>,
}

impl PositionRow {
    /// Converts the row into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` for an unknown enumeration value.
    pub fn try_into_position(self) -> RepositoryResult<PositionHistory> {
        Ok(PositionHistory {
            direction: parse("direction", &self.direction)?,
            close_reason: parse("close_reason", &self.close_reason)?,
            id: self.id,
            account_id: self.account_id,
            instrument: self.instrument,
            volume: self.volume,
            open_price: self.open_price,
            close_price: self.close_price,
            open_date: self.open_date,
            close_date: self.close_date,
            pnl: self.pnl,
            deal_id: self.deal_id,
            history_timestamp: self.history_timestamp,
        })
    }
}

/// Row of `deals`.
#[derive(Debug, sqlx::FromRow)]
pub struct DealRow {
    deal_id: String,
    created: DateTime<Utc>,
    account_id: String,
    instrument: String,
    open_trade_id: String,
    open_order_type: String,
    open_order_volume: Decimal,
    open_order_expected_price: Option<Decimal>,
    close_trade_id: String,
    close_order_type: String,
    close_order_volume: Decimal,
    close_order_expected_price: Option<Decimal>,
    direction: String,
    volume: Decimal,
    originator: String,
    open_price: Decimal,
    open_fx_price: Decimal,
    close_price: Decimal,
    close_fx_price: Decimal,
    fpl: Decimal,
    pnl_of_the_last_day: Decimal,
    additional_info: Option<String>,
}

impl DealRow {
    /// Converts the row into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` for an unknown enumeration value.
    pub fn try_into_deal(self) -> RepositoryResult<Deal> {
        Ok(Deal {
            open_order_type: parse("open_order_type", &self.open_order_type)?,
            close_order_type: parse("close_order_type", &self.close_order_type)?,
            direction: parse("direction", &self.direction)?,
            originator: parse("originator", &self.originator)?,
            deal_id: self.deal_id,
            created: self.created,
            account_id: self.account_id,
            instrument: self.instrument,
            open_trade_id: self.open_trade_id,
            open_order_volume: self.open_order_volume,
            open_order_expected_price: self.open_order_expected_price,
            close_trade_id: self.close_trade_id,
            close_order_volume: self.close_order_volume,
            close_order_expected_price: self.close_order_expected_price,
            volume: self.volume,
            open_price: self.open_price,
            open_fx_price: self.open_fx_price,
            close_price: self.close_price,
            close_fx_price: self.close_fx_price,
            fpl: self.fpl,
            pnl_of_the_last_day: self.pnl_of_the_last_day,
            additional_info: self.additional_info,
        })
    }
}

/// Row of the per-instrument deal roll-up.
#[derive(Debug, sqlx::FromRow)]
pub struct AggregatedDealRow {
    account_id: String,
    instrument: String,
    deals_count: i64,
    volume: Decimal,
    fpl: Decimal,
    pnl_of_the_last_day: Decimal,
    last_deal_created: DateTime<Utc>,
}

impl From<AggregatedDealRow> for AggregatedDeal {
    fn from(row: AggregatedDealRow) -> Self {
        Self {
            account_id: row.account_id,
            instrument: row.instrument,
            deals_count: row.deals_count.unsigned_abs(),
            volume: row.volume,
            fpl: row.fpl,
            pnl_of_the_last_day: row.pnl_of_the_last_day,
            last_deal_created: row.last_deal_created,
        }
    }
}

/// Row of `deal_commission_params`.
#[derive(Debug, sqlx::FromRow)]
pub struct CommissionParamsRow {
    deal_id: String,
    open_trade_id: Option<String>,
    close_trade_id: Option<String>,
    open_order_volume: Option<Decimal>,
    close_order_volume: Option<Decimal>,
    volume: Option<Decimal>,
    calculated_at: Option<DateTime<Utc>>,
}

impl From<CommissionParamsRow> for CommissionParams {
    fn from(row: CommissionParamsRow) -> Self {
        Self {
            deal_id: row.deal_id,
            open_trade_id: row.open_trade_id,
            close_trade_id: row.close_trade_id,
            open_order_volume: row.open_order_volume,
            close_order_volume: row.close_order_volume,
            volume: row.volume,
            calculated_at: row.calculated_at,
        }
    }
}

/// Row of `trades`.
#[derive(Debug, sqlx::FromRow)]
pub struct TradeRow {
    id: String,
    account_id: String,
    order_id: String,
    position_id: String,
    instrument: String,
    trade_type: String,
    price: Decimal,
    volume: Decimal,
    trade_timestamp: DateTime<Utc>,
}

impl TradeRow {
    /// Converts the row into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` for an unknown trade type.
    pub fn try_into_trade(self) -> RepositoryResult<Trade> {
        Ok(Trade {
            trade_type: parse("trade_type", &self.trade_type)?,
            id: self.id,
            account_id: self.account_id,
            order_id: self.order_id,
            position_id: self.position_id,
            instrument: self.instrument,
            price: self.price,
            volume: self.volume,
            timestamp: self.trade_timestamp,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{OrderStatus, TradeType};

    fn trade_row(trade_type: &str) -> TradeRow {
        TradeRow {
            id: "T1".into(),
            account_id: "A1".into(),
            order_id: "O1".into(),
            position_id: "P1".into(),
            instrument: "BTCUSD".into(),
            trade_type: trade_type.into(),
            price: Decimal::ONE,
            volume: Decimal::ONE,
            trade_timestamp: Utc::now(),
        }
    }

    #[test]
    fn trade_row_converts() {
        let trade = trade_row("Sell").try_into_trade().unwrap();
        assert_eq!(trade.trade_type, TradeType::Sell);
    }

    #[test]
    fn unknown_enum_value_is_a_serialization_error() {
        let err = trade_row("Hold").try_into_trade().unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
        assert!(err.to_string().contains("trade_type"));
    }

    #[test]
    fn parse_is_case_insensitive() {
        let status: OrderStatus = parse("status", "executionstarted").unwrap();
        assert_eq!(status, OrderStatus::ExecutionStarted);
    }
}
