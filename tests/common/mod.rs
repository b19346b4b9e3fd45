//! Record builders shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use trading_history::domain::entities::{Deal, OrderHistory, PositionHistory, Trade};
use trading_history::domain::value_objects::{
    OrderDirection, OrderStatus, OrderType, OrderUpdateType, OriginatorType, PositionCloseReason,
    PositionDirection, TradeType,
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn at(minute: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minute)
}

pub fn order(id: &str, account: &str, parent: Option<&str>, minute: i64) -> OrderHistory {
    OrderHistory {
        id: id.to_string(),
        account_id: account.to_string(),
        instrument: "BTCUSD".to_string(),
        parent_order_id: parent.map(str::to_string),
        position_id: None,
        direction: OrderDirection::Buy,
        order_type: if parent.is_some() { OrderType::StopLoss } else { OrderType::Market },
        status: OrderStatus::Active,
        originator: OriginatorType::Investor,
        update_type: OrderUpdateType::Place,
        volume: Decimal::ONE,
        expected_open_price: None,
        execution_price: None,
        pnl: Decimal::ZERO,
        created_timestamp: at(minute),
        modified_timestamp: at(minute),
        comment: None,
    }
}

pub fn position(id: &str, account: &str, instrument: &str, minute: i64) -> PositionHistory {
    PositionHistory {
        id: id.to_string(),
        account_id: account.to_string(),
        instrument: instrument.to_string(),
        direction: PositionDirection::Long,
        volume: Decimal::ONE,
        open_price: Decimal::new(100, 0),
        close_price: Some(Decimal::new(105, 0)),
        open_date: base_time(),
        close_date: Some(at(minute)),
        close_reason: PositionCloseReason::Close,
        pnl: Decimal::new(5, 0),
        deal_id: None,
        history_timestamp: at(minute),
    }
}

pub fn deal(id: &str, account: &str, instrument: &str, minute: i64, fpl: i64) -> Deal {
    Deal {
        deal_id: id.to_string(),
        created: at(minute),
        account_id: account.to_string(),
        instrument: instrument.to_string(),
        open_trade_id: format!("{id}-open"),
        open_order_type: OrderType::Market,
        open_order_volume: Decimal::ONE,
        open_order_expected_price: None,
        close_trade_id: format!("{id}-close"),
        close_order_type: OrderType::Market,
        close_order_volume: Decimal::ONE,
        close_order_expected_price: None,
        direction: PositionDirection::Long,
        volume: Decimal::ONE,
        originator: OriginatorType::Investor,
        open_price: Decimal::new(100, 0),
        open_fx_price: Decimal::ONE,
        close_price: Decimal::new(105, 0),
        close_fx_price: Decimal::ONE,
        fpl: Decimal::new(fpl, 0),
        pnl_of_the_last_day: Decimal::ZERO,
        additional_info: None,
    }
}

/// A position closed by `deal`, linked to it.
pub fn closed_position(position_id: &str, deal: &Deal) -> PositionHistory {
    let mut record = position(position_id, &deal.account_id, &deal.instrument, 0);
    record.deal_id = Some(deal.deal_id.clone());
    record.close_date = Some(deal.created);
    record.history_timestamp = deal.created;
    record
}

pub fn trade(id: &str, order_id: &str, position_id: &str, minute: i64) -> Trade {
    Trade {
        id: id.to_string(),
        account_id: "A1".to_string(),
        order_id: order_id.to_string(),
        position_id: position_id.to_string(),
        instrument: "BTCUSD".to_string(),
        trade_type: TradeType::Buy,
        price: Decimal::new(100, 0),
        volume: Decimal::ONE,
        timestamp: at(minute),
    }
}
