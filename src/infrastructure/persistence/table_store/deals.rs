//! # Table-Store Deals
//!
//! Read side of the `DealsHistory` table. Rows are written by
//! [`TablePositionsHistoryRepository`](super::TablePositionsHistoryRepository).

use super::TableContext;
use super::storage::TableName;
use crate::domain::entities::{AggregatedDeal, Deal};
use crate::domain::value_objects::{Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::{
    DealFilter, Keyed, aggregate_deals, select_page, total_pnl, total_profit,
};
use crate::infrastructure::persistence::traits::{DealsRepository, FilterLocation, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Deals on the table store.
#[derive(Debug, Clone)]
pub struct TableDealsRepository {
    context: TableContext,
}

impl TableDealsRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(context: TableContext) -> Self {
        Self { context }
    }

    async fn load(&self) -> RepositoryResult<Vec<Keyed<String, Deal>>> {
        self.context.load(TableName::DealsHistory).await
    }
}

#[async_trait]
impl DealsRepository for TableDealsRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ClientScan
    }

    async fn get(&self, deal_id: &str) -> RepositoryResult<Option<Deal>> {
        with_deadline("deals.get", self.context.timeout(), async {
            Ok(self
                .load()
                .await?
                .into_iter()
                .map(|row| row.record)
                .find(|deal| deal.deal_id == deal_id))
        })
        .await
    }

    async fn get_by_pages(
        &self,
        filter: &DealFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Deal>> {
        with_deadline("deals.get_by_pages", self.context.timeout(), async {
            let rows = self.load().await?;
            Ok(select_page(
                &rows,
                |d: &Deal| filter.matches(d),
                page,
                order,
                |d| d.created,
            ))
        })
        .await
    }

    async fn get_aggregated(
        &self,
        account_id: &str,
        filter: &DealFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<AggregatedDeal>> {
        with_deadline("deals.get_aggregated", self.context.timeout(), async {
            let rows = self.load().await?;
            Ok(aggregate_deals(
                rows.iter().map(|row| &row.record),
                account_id,
                filter,
                page,
                order,
            ))
        })
        .await
    }

    async fn get_total_pnl(&self, filter: &DealFilter) -> RepositoryResult<Decimal> {
        with_deadline("deals.get_total_pnl", self.context.timeout(), async {
            let rows = self.load().await?;
            Ok(total_pnl(rows.iter().map(|row| &row.record), filter))
        })
        .await
    }

    async fn get_total_profit(&self, account_id: &str, days: &[NaiveDate]) -> RepositoryResult<Decimal> {
        with_deadline("deals.get_total_profit", self.context.timeout(), async {
            let rows = self.load().await?;
            Ok(total_profit(rows.iter().map(|row| &row.record), account_id, days))
        })
        .await
    }
}
