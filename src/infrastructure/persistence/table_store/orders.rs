//! # Table-Store Order History

use super::TableContext;
use super::storage::TableName;
use crate::domain::entities::OrderHistory;
use crate::domain::value_objects::{OrderStatus, Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::{
    OrderHistoryFilter, select_order_by_id, select_order_history,
};
use crate::infrastructure::persistence::traits::{
    FilterLocation, OrdersHistoryRepository, RepositoryResult,
};
use async_trait::async_trait;

/// Order history on the table store, partitioned by account.
#[derive(Debug, Clone)]
pub struct TableOrdersHistoryRepository {
    context: TableContext,
}

impl TableOrdersHistoryRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(context: TableContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl OrdersHistoryRepository for TableOrdersHistoryRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ClientScan
    }

    async fn add(&self, order: &OrderHistory) -> RepositoryResult<()> {
        with_deadline(
            "orders.add",
            self.context.timeout(),
            self.context
                .insert(TableName::OrdersHistory, &order.account_id, "OrderHistory", order),
        )
        .await
    }

    async fn get_history_by_order_id(
        &self,
        order_id: &str,
        status: Option<OrderStatus>,
        with_related: bool,
    ) -> RepositoryResult<Vec<OrderHistory>> {
        with_deadline("orders.get_history_by_order_id", self.context.timeout(), async {
            let rows = self.context.load(TableName::OrdersHistory).await?;
            Ok(select_order_by_id(&rows, order_id, status, with_related))
        })
        .await
    }

    async fn get_history_by_pages(
        &self,
        filter: &OrderHistoryFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<OrderHistory>> {
        with_deadline("orders.get_history_by_pages", self.context.timeout(), async {
            let rows = self.context.load(TableName::OrdersHistory).await?;
            Ok(select_order_history(&rows, filter, page, order))
        })
        .await
    }
}
