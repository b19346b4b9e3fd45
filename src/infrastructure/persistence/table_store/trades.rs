//! # Table-Store Trades

use super::TableContext;
use super::storage::TableName;
use crate::domain::entities::Trade;
use crate::domain::value_objects::{Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::{TradeFilter, select_page};
use crate::infrastructure::persistence::traits::{FilterLocation, RepositoryResult, TradesRepository};
use async_trait::async_trait;

/// Trades on the table store.
#[derive(Debug, Clone)]
pub struct TableTradesRepository {
    context: TableContext,
}

impl TableTradesRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(context: TableContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl TradesRepository for TableTradesRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ClientScan
    }

    async fn add(&self, trade: &Trade) -> RepositoryResult<()> {
        with_deadline(
            "trades.add",
            self.context.timeout(),
            self.context
                .insert(TableName::TradesHistory, &trade.account_id, "Trade", trade),
        )
        .await
    }

    async fn get(&self, trade_id: &str) -> RepositoryResult<Option<Trade>> {
        with_deadline("trades.get", self.context.timeout(), async {
            Ok(self
                .context
                .load::<Trade>(TableName::TradesHistory)
                .await?
                .into_iter()
                .map(|row| row.record)
                .find(|trade| trade.id == trade_id))
        })
        .await
    }

    async fn get_by_pages(
        &self,
        filter: &TradeFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Trade>> {
        with_deadline("trades.get_by_pages", self.context.timeout(), async {
            let rows = self.context.load(TableName::TradesHistory).await?;
            Ok(select_page(
                &rows,
                |t: &Trade| filter.matches(t),
                page,
                order,
                |t| t.timestamp,
            ))
        })
        .await
    }
}
