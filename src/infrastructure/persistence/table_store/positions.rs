//! # Table-Store Position History
//!
//! A position and its deal are written as two rows in two tables, both keyed
//! by the deal id. If the deal row fails, the position row stays; writing the
//! pair again replaces both rows, so a retried write leaves one of each.

use super::TableContext;
use super::storage::TableName;
use crate::domain::entities::{Deal, PositionHistory};
use crate::domain::value_objects::{Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::{PositionFilter, select_page};
use crate::infrastructure::persistence::traits::{
    FilterLocation, PositionsHistoryRepository, RepositoryResult,
};
use async_trait::async_trait;

/// Position history on the table store.
#[derive(Debug, Clone)]
pub struct TablePositionsHistoryRepository {
    context: TableContext,
}

impl TablePositionsHistoryRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(context: TableContext) -> Self {
        Self { context }
    }

    async fn write(&self, position: &PositionHistory, deal: Option<&Deal>) -> RepositoryResult<()> {
        let Some(deal) = deal else {
            return self
                .context
                .insert(
                    TableName::PositionsHistory,
                    &position.account_id,
                    "PositionHistory",
                    position,
                )
                .await;
        };

        self.context
            .put(
                TableName::PositionsHistory,
                &position.account_id,
                &deal.deal_id,
                "PositionHistory",
                position,
            )
            .await?;
        if let Err(e) = self
            .context
            .put(TableName::DealsHistory, &deal.account_id, &deal.deal_id, "Deal", deal)
            .await
        {
            tracing::error!(
                error = %e,
                position_id = %position.id,
                deal_id = %deal.deal_id,
                "position stored without its deal"
            );
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl PositionsHistoryRepository for TablePositionsHistoryRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ClientScan
    }

    async fn add(&self, position: &PositionHistory, deal: Option<&Deal>) -> RepositoryResult<()> {
        with_deadline("positions.add", self.context.timeout(), self.write(position, deal)).await
    }

    async fn get(&self, position_id: &str) -> RepositoryResult<Vec<PositionHistory>> {
        with_deadline("positions.get", self.context.timeout(), async {
            let rows = self
                .context
                .load::<PositionHistory>(TableName::PositionsHistory)
                .await?;
            Ok(rows
                .into_iter()
                .filter(|row| row.record.id == position_id)
                .map(|row| row.record)
                .collect())
        })
        .await
    }

    async fn get_by_pages(
        &self,
        filter: &PositionFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<PositionHistory>> {
        with_deadline("positions.get_by_pages", self.context.timeout(), async {
            let rows = self.context.load(TableName::PositionsHistory).await?;
            Ok(select_page(
                &rows,
                |p: &PositionHistory| filter.matches(p),
                page,
                order,
                |p| p.history_timestamp,
            ))
        })
        .await
    }
}
