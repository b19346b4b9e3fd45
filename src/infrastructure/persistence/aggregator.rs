//! # Repository Aggregator
//!
//! Write-only fan-out over several backends of the same contract.
//!
//! Members are written sequentially in configuration order. The first failure
//! stops the fan-out: earlier members keep the record, later members never
//! see it. Reads are rejected, because members may disagree.
//!
//! ```text
//! add(record)
//!   member 0 ── ok
//!   member 1 ── err ──▶ Replication { member: 1, members: 3 }
//!   member 2    (not attempted)
//! ```

use crate::domain::entities::{Deal, OrderHistory, PositionHistory, Trade};
use crate::domain::value_objects::{OrderStatus, Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::query::{OrderHistoryFilter, PositionFilter, TradeFilter};
use crate::infrastructure::persistence::traits::{
    FilterLocation, OrdersHistoryRepository, PositionsHistoryRepository, RepositoryError,
    RepositoryResult, TradesRepository,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Fans writes out to every member repository.
#[derive(Debug)]
pub struct RepositoryAggregator<R: ?Sized> {
    members: Vec<Arc<R>>,
}

impl<R: ?Sized> Clone for RepositoryAggregator<R> {
    fn clone(&self) -> Self {
        Self {
            members: self.members.clone(),
        }
    }
}

impl<R: ?Sized> RepositoryAggregator<R> {
    /// Creates an aggregator over `members`, written in order.
    #[must_use]
    pub fn new(members: Vec<Arc<R>>) -> Self {
        Self { members }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn replication_error(&self, member: usize, source: RepositoryError) -> RepositoryError {
        tracing::error!(
            error = %source,
            member,
            members = self.members.len(),
            "replicated write failed, earlier members keep the record"
        );
        RepositoryError::replication(member, self.members.len(), source)
    }
}

const READS_UNSUPPORTED: &str = "reads through the replication aggregator";

#[async_trait]
impl OrdersHistoryRepository for RepositoryAggregator<dyn OrdersHistoryRepository> {
    fn filter_location(&self) -> FilterLocation {
        self.members
            .first()
            .map_or(FilterLocation::ServerSide, |m| m.filter_location())
    }

    async fn add(&self, order: &OrderHistory) -> RepositoryResult<()> {
        for (index, member) in self.members.iter().enumerate() {
            member
                .add(order)
                .await
                .map_err(|e| self.replication_error(index, e))?;
        }
        Ok(())
    }

    async fn get_history_by_order_id(
        &self,
        _order_id: &str,
        _status: Option<OrderStatus>,
        _with_related: bool,
    ) -> RepositoryResult<Vec<OrderHistory>> {
        Err(RepositoryError::Unsupported(READS_UNSUPPORTED))
    }

    async fn get_history_by_pages(
        &self,
        _filter: &OrderHistoryFilter,
        _page: Option<Page>,
        _order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<OrderHistory>> {
        Err(RepositoryError::Unsupported(READS_UNSUPPORTED))
    }
}

#[async_trait]
impl PositionsHistoryRepository for RepositoryAggregator<dyn PositionsHistoryRepository> {
    fn filter_location(&self) -> FilterLocation {
        self.members
            .first()
            .map_or(FilterLocation::ServerSide, |m| m.filter_location())
    }

    async fn add(&self, position: &PositionHistory, deal: Option<&Deal>) -> RepositoryResult<()> {
        for (index, member) in self.members.iter().enumerate() {
            member
                .add(position, deal)
                .await
                .map_err(|e| self.replication_error(index, e))?;
        }
        Ok(())
    }

    async fn get(&self, _position_id: &str) -> RepositoryResult<Vec<PositionHistory>> {
        Err(RepositoryError::Unsupported(READS_UNSUPPORTED))
    }

    async fn get_by_pages(
        &self,
        _filter: &PositionFilter,
        _page: Option<Page>,
        _order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<PositionHistory>> {
        Err(RepositoryError::Unsupported(READS_UNSUPPORTED))
    }
}

#[async_trait]
impl TradesRepository for RepositoryAggregator<dyn TradesRepository> {
    fn filter_location(&self) -> FilterLocation {
        self.members
            .first()
            .map_or(FilterLocation::ServerSide, |m| m.filter_location())
    }

    async fn add(&self, trade: &Trade) -> RepositoryResult<()> {
        for (index, member) in self.members.iter().enumerate() {
            member
                .add(trade)
                .await
                .map_err(|e| self.replication_error(index, e))?;
        }
        Ok(())
    }

    async fn get(&self, _trade_id: &str) -> RepositoryResult<Option<Trade>> {
        Err(RepositoryError::Unsupported(READS_UNSUPPORTED))
    }

    async fn get_by_pages(
        &self,
        _filter: &TradeFilter,
        _page: Option<Page>,
        _order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Trade>> {
        Err(RepositoryError::Unsupported(READS_UNSUPPORTED))
    }
}
