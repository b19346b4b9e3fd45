//! # Trading History Services
//!
//! The ingestion and query façade in front of [`HistoryStorage`].
//!
//! [`HistoryIngestor`] sends writes to the configured writers: a single
//! backend, or the replication aggregator in replicated mode.
//! [`TradingHistoryService`] validates query parameters and reads from the
//! read backend.

use crate::application::error::ApplicationResult;
use crate::application::validation::{require_id, validate_aggregated, validate_paging};
use crate::domain::entities::{AggregatedDeal, Deal, OrderHistory, PositionHistory, Trade};
use crate::domain::value_objects::{PaginatedResult, SortOrder, TimeRange};
use crate::infrastructure::persistence::query::non_blank;
use crate::infrastructure::persistence::{
    DealFilter, DealsRepository, HistoryStorage, OrderHistoryFilter, OrdersHistoryRepository,
    PositionFilter, PositionsHistoryRepository, TradeFilter, TradesRepository,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Write side of the history store.
#[derive(Debug, Clone)]
pub struct HistoryIngestor {
    orders: Arc<dyn OrdersHistoryRepository>,
    positions: Arc<dyn PositionsHistoryRepository>,
    trades: Arc<dyn TradesRepository>,
}

impl HistoryIngestor {
    /// Creates an ingestor over the writers of `storage`.
    #[must_use]
    pub fn new(storage: &HistoryStorage) -> Self {
        Self {
            orders: storage.orders_writer(),
            positions: storage.positions_writer(),
            trades: storage.trades_writer(),
        }
    }

    /// Appends an order history row.
    ///
    /// # Errors
    ///
    /// Returns an error if any writer rejects the row.
    pub async fn add_order(&self, order: &OrderHistory) -> ApplicationResult<()> {
        debug!(order_id = %order.id, status = %order.status, "Storing order history");
        self.orders.add(order).await?;
        Ok(())
    }

    /// Stores a closed position and the deal it produced, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the position or its deal could not be stored.
    pub async fn add_position(&self, position: &PositionHistory, deal: Option<&Deal>) -> ApplicationResult<()> {
        debug!(
            position_id = %position.id,
            deal_id = deal.map(|d| d.deal_id.as_str()),
            "Storing position history"
        );
        self.positions.add(position, deal).await?;
        Ok(())
    }

    /// Appends a trade.
    ///
    /// # Errors
    ///
    /// Returns an error if any writer rejects the trade.
    pub async fn add_trade(&self, trade: &Trade) -> ApplicationResult<()> {
        debug!(trade_id = %trade.id, order_id = %trade.order_id, "Storing trade");
        self.trades.add(trade).await?;
        Ok(())
    }
}

/// Read side of the history store.
#[derive(Debug, Clone)]
pub struct TradingHistoryService {
    orders: Arc<dyn OrdersHistoryRepository>,
    positions: Arc<dyn PositionsHistoryRepository>,
    deals: Arc<dyn DealsRepository>,
    trades: Arc<dyn TradesRepository>,
}

impl TradingHistoryService {
    /// Creates a service over the read backend of `storage`.
    #[must_use]
    pub fn new(storage: &HistoryStorage) -> Self {
        let reads = storage.reads();
        Self {
            orders: reads.orders(),
            positions: reads.positions(),
            deals: reads.deals(),
            trades: reads.trades(),
        }
    }

    /// Lists every order history row matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn list_orders(&self, filter: &OrderHistoryFilter) -> ApplicationResult<Vec<OrderHistory>> {
        Ok(self.orders.get_history(filter).await?)
    }

    /// Lists one page of order history rows.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paging, or a storage error.
    pub async fn list_orders_paged(
        &self,
        filter: &OrderHistoryFilter,
        skip: Option<i64>,
        take: Option<i64>,
        ascending: bool,
    ) -> ApplicationResult<PaginatedResult<OrderHistory>> {
        let page = validate_paging(skip, take)?;
        Ok(self
            .orders
            .get_history_by_pages(filter, page, SortOrder::from_ascending(ascending))
            .await?)
    }

    /// Lists every closed position of an account and instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn list_positions(
        &self,
        account_id: Option<String>,
        instrument: Option<String>,
    ) -> ApplicationResult<Vec<PositionHistory>> {
        let filter = PositionFilter::new(account_id, instrument);
        Ok(self.positions.get_by_filter(&filter).await?)
    }

    /// Lists one page of closed positions.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paging, or a storage error.
    pub async fn list_positions_paged(
        &self,
        account_id: Option<String>,
        instrument: Option<String>,
        skip: Option<i64>,
        take: Option<i64>,
        ascending: bool,
    ) -> ApplicationResult<PaginatedResult<PositionHistory>> {
        let page = validate_paging(skip, take)?;
        let filter = PositionFilter::new(account_id, instrument);
        Ok(self
            .positions
            .get_by_pages(&filter, page, SortOrder::from_ascending(ascending))
            .await?)
    }

    /// Lists every deal matching the filter, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn list_deals(
        &self,
        account_id: Option<String>,
        instrument: Option<String>,
        close_time: TimeRange,
    ) -> ApplicationResult<Vec<Deal>> {
        let filter = DealFilter::new(account_id, instrument, close_time);
        Ok(self.deals.get_by_filter(&filter).await?)
    }

    /// Lists one page of deals.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paging, or a storage error.
    pub async fn list_deals_paged(
        &self,
        account_id: Option<String>,
        instrument: Option<String>,
        close_time: TimeRange,
        skip: Option<i64>,
        take: Option<i64>,
        ascending: bool,
    ) -> ApplicationResult<PaginatedResult<Deal>> {
        let page = validate_paging(skip, take)?;
        let filter = DealFilter::new(account_id, instrument, close_time);
        Ok(self
            .deals
            .get_by_pages(&filter, page, SortOrder::from_ascending(ascending))
            .await?)
    }

    /// Lists one page of per-instrument deal roll-ups of an account.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank account or malformed paging,
    /// or a storage error.
    pub async fn get_aggregated_deals(
        &self,
        account_id: Option<String>,
        instrument: Option<String>,
        close_time: TimeRange,
        skip: Option<i64>,
        take: Option<i64>,
        ascending: bool,
    ) -> ApplicationResult<PaginatedResult<AggregatedDeal>> {
        let (account, page) = validate_aggregated(&account_id, skip, take)?;
        let filter = DealFilter::new(Some(account.clone()), instrument, close_time);
        Ok(self
            .deals
            .get_aggregated(&account, &filter, page, SortOrder::from_ascending(ascending))
            .await?)
    }

    /// Gets a deal by id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank id, or a storage error.
    pub async fn get_deal_by_id(&self, deal_id: &str) -> ApplicationResult<Option<Deal>> {
        let deal_id = require_id("deal id", deal_id)?;
        Ok(self.deals.get(deal_id).await?)
    }

    /// Sums the realized PnL of the matching deals.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn get_total_pnl(
        &self,
        account_id: Option<String>,
        instrument: Option<String>,
        close_time: TimeRange,
    ) -> ApplicationResult<Decimal> {
        let filter = DealFilter::new(account_id, instrument, close_time);
        Ok(self.deals.get_total_pnl(&filter).await?)
    }

    /// Sums the realized PnL of an account over whole UTC days.
    ///
    /// A blank account or an empty day list yields zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn get_total_profit(&self, account_id: Option<String>, days: &[NaiveDate]) -> ApplicationResult<Decimal> {
        let Some(account) = non_blank(&account_id) else {
            warn!("Total profit requested without an account");
            return Ok(Decimal::ZERO);
        };
        if days.is_empty() {
            warn!(account_id = %account, "Total profit requested without days");
            return Ok(Decimal::ZERO);
        }
        Ok(self.deals.get_total_profit(account, days).await?)
    }

    /// Gets a trade by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn get_trade(&self, trade_id: &str) -> ApplicationResult<Option<Trade>> {
        Ok(self.trades.get(trade_id).await?)
    }

    /// Lists the trades of an order and/or position.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn list_trades(
        &self,
        order_id: Option<String>,
        position_id: Option<String>,
    ) -> ApplicationResult<Vec<Trade>> {
        let filter = TradeFilter::by_order_and_position(order_id, position_id);
        Ok(self.trades.get_by_filter(&filter).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::error::{ApplicationError, ValidationError};
    use crate::domain::value_objects::{
        OrderDirection, OrderStatus, OrderType, OrderUpdateType, OriginatorType, PositionCloseReason,
        PositionDirection, TradeType,
    };
    use crate::infrastructure::persistence::HistoryBackend;
    use crate::infrastructure::persistence::table_store::TableStoreBackend;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
    }

    fn storage() -> HistoryStorage {
        HistoryStorage::single(HistoryBackend::TableStore(TableStoreBackend::in_memory(
            std::time::Duration::from_secs(5),
        )))
    }

    fn order(id: &str, minute: i64) -> OrderHistory {
        OrderHistory {
            id: id.to_string(),
            account_id: "A1".to_string(),
            instrument: "BTCUSD".to_string(),
            parent_order_id: None,
            position_id: None,
            direction: OrderDirection::Buy,
            order_type: OrderType::Market,
            status: OrderStatus::Executed,
            originator: OriginatorType::Investor,
            update_type: OrderUpdateType::Executed,
            volume: Decimal::ONE,
            expected_open_price: None,
            execution_price: Some(Decimal::new(100, 0)),
            pnl: Decimal::ZERO,
            created_timestamp: base_time() + Duration::minutes(minute),
            modified_timestamp: base_time() + Duration::minutes(minute),
            comment: None,
        }
    }

    fn position(id: &str, deal_id: Option<&str>) -> PositionHistory {
        PositionHistory {
            id: id.to_string(),
            account_id: "A1".to_string(),
            instrument: "BTCUSD".to_string(),
            direction: PositionDirection::Long,
            volume: Decimal::ONE,
            open_price: Decimal::new(100, 0),
            close_price: Some(Decimal::new(110, 0)),
            open_date: base_time(),
            close_date: Some(base_time() + Duration::hours(1)),
            close_reason: PositionCloseReason::Close,
            pnl: Decimal::new(10, 0),
            deal_id: deal_id.map(str::to_string),
            history_timestamp: base_time() + Duration::hours(1),
        }
    }

    fn deal(id: &str, fpl: i64) -> Deal {
        Deal {
            deal_id: id.to_string(),
            created: base_time() + Duration::hours(1),
            account_id: "A1".to_string(),
            instrument: "BTCUSD".to_string(),
            open_trade_id: "T1".to_string(),
            open_order_type: OrderType::Market,
            open_order_volume: Decimal::ONE,
            open_order_expected_price: None,
            close_trade_id: "T2".to_string(),
            close_order_type: OrderType::Market,
            close_order_volume: Decimal::ONE,
            close_order_expected_price: None,
            direction: PositionDirection::Long,
            volume: Decimal::ONE,
            originator: OriginatorType::Investor,
            open_price: Decimal::new(100, 0),
            open_fx_price: Decimal::ONE,
            close_price: Decimal::new(110, 0),
            close_fx_price: Decimal::ONE,
            fpl: Decimal::new(fpl, 0),
            pnl_of_the_last_day: Decimal::ZERO,
            additional_info: None,
        }
    }

    fn trade(id: &str, order_id: &str, position_id: &str) -> Trade {
        Trade {
            id: id.to_string(),
            account_id: "A1".to_string(),
            order_id: order_id.to_string(),
            position_id: position_id.to_string(),
            instrument: "BTCUSD".to_string(),
            trade_type: TradeType::Buy,
            price: Decimal::new(100, 0),
            volume: Decimal::ONE,
            timestamp: base_time(),
        }
    }

    mod validation {
        use super::*;

        #[tokio::test]
        async fn half_paging_is_a_client_error() {
            let service = TradingHistoryService::new(&storage());
            let err = service
                .list_orders_paged(&OrderHistoryFilter::default(), Some(0), None, true)
                .await
                .unwrap_err();
            assert!(err.is_client_error());
        }

        #[tokio::test]
        async fn aggregated_requires_account() {
            let service = TradingHistoryService::new(&storage());
            let err = service
                .get_aggregated_deals(None, None, TimeRange::unbounded(), None, None, true)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ApplicationError::Validation(ValidationError::MissingAccount)
            ));
        }

        #[tokio::test]
        async fn blank_deal_id_is_rejected() {
            let service = TradingHistoryService::new(&storage());
            let err = service.get_deal_by_id("  ").await.unwrap_err();
            assert!(err.is_validation());
        }
    }

    mod round_trip {
        use super::*;

        #[tokio::test]
        async fn ingested_orders_are_paged_newest_first() {
            let storage = storage();
            let ingestor = HistoryIngestor::new(&storage);
            for (i, id) in ["O1", "O2", "O3"].iter().enumerate() {
                ingestor.add_order(&order(id, i as i64)).await.unwrap();
            }

            let service = TradingHistoryService::new(&storage);
            let page = service
                .list_orders_paged(&OrderHistoryFilter::default(), Some(0), Some(2), false)
                .await
                .unwrap();
            let ids: Vec<_> = page.contents.iter().map(|o| o.id.as_str()).collect();
            assert_eq!(ids, vec!["O3", "O2"]);
            assert_eq!(page.total_size, 3);
        }

        #[tokio::test]
        async fn position_with_deal_is_queryable() {
            let storage = storage();
            let ingestor = HistoryIngestor::new(&storage);
            ingestor
                .add_position(&position("P1", Some("D1")), Some(&deal("D1", 10)))
                .await
                .unwrap();

            let service = TradingHistoryService::new(&storage);
            let positions = service.list_positions(Some("A1".into()), None).await.unwrap();
            assert_eq!(positions.len(), 1);
            assert_eq!(service.get_deal_by_id("D1").await.unwrap().unwrap().fpl, Decimal::new(10, 0));
            assert_eq!(
                service
                    .get_total_pnl(Some("A1".into()), Some("BTCUSD".into()), TimeRange::unbounded())
                    .await
                    .unwrap(),
                Decimal::new(10, 0)
            );
        }

        #[tokio::test]
        async fn trades_by_order_and_position() {
            let storage = storage();
            let ingestor = HistoryIngestor::new(&storage);
            ingestor.add_trade(&trade("T1", "O1", "P1")).await.unwrap();
            ingestor.add_trade(&trade("T2", "O2", "P1")).await.unwrap();

            let service = TradingHistoryService::new(&storage);
            assert_eq!(service.list_trades(None, Some("P1".into())).await.unwrap().len(), 2);
            assert_eq!(
                service.list_trades(Some("O2".into()), Some("P1".into())).await.unwrap().len(),
                1
            );
            assert!(service.get_trade("T9").await.unwrap().is_none());
        }
    }

    mod total_profit {
        use super::*;

        #[tokio::test]
        async fn blank_account_yields_zero() {
            let service = TradingHistoryService::new(&storage());
            let day = base_time().date_naive();
            assert_eq!(
                service.get_total_profit(Some(" ".into()), &[day]).await.unwrap(),
                Decimal::ZERO
            );
        }

        #[tokio::test]
        async fn no_days_yields_zero() {
            let storage = storage();
            HistoryIngestor::new(&storage)
                .add_position(&position("P1", Some("D1")), Some(&deal("D1", 10)))
                .await
                .unwrap();
            let service = TradingHistoryService::new(&storage);
            assert_eq!(
                service.get_total_profit(Some("A1".into()), &[]).await.unwrap(),
                Decimal::ZERO
            );
            assert_eq!(
                service
                    .get_total_profit(Some("A1".into()), &[base_time().date_naive()])
                    .await
                    .unwrap(),
                Decimal::new(10, 0)
            );
        }
    }
}
