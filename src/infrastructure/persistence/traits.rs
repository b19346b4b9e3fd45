//! # Repository Traits
//!
//! Port definitions for persistence abstraction.
//!
//! The contracts below are implemented by the relational backend
//! ([`postgres`](super::postgres)), the table-store backend
//! ([`table_store`](super::table_store)) and, for writes, the
//! [`RepositoryAggregator`](super::aggregator::RepositoryAggregator).
//!
//! # Available Repositories
//!
//! - [`OrdersHistoryRepository`]: Order lifecycle history
//! - [`PositionsHistoryRepository`]: Closed positions, written together with their deal
//! - [`DealsRepository`]: Deals and deal roll-ups (read side)
//! - [`TradesRepository`]: Executions
//!
//! Lookups that match nothing return an empty result, never an error.
//!
//! # Examples
//!
//! ```ignore
//! use trading_history::infrastructure::persistence::traits::DealsRepository;
//!
//! async fn account_pnl(repo: &dyn DealsRepository) {
//!     let filter = DealFilter::default().with_account("A1");
//!     let total = repo.get_total_pnl(&filter).await?;
//!     println!("total pnl {total}");
//! }
//! ```

use crate::domain::entities::{
    AggregatedDeal, Deal, OrderHistory, PositionHistory, Trade,
};
use crate::domain::value_objects::{OrderStatus, Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::query::{
    DealFilter, OrderHistoryFilter, PositionFilter, TradeFilter,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Schema objects could not be created; the backend must not start.
    #[error("Schema provisioning failed for {object}: {message}")]
    SchemaProvisioning {
        /// Table, index or procedure name.
        object: String,
        /// Underlying failure.
        message: String,
    },

    /// Single-record insert failed.
    #[error("Failed to write {entity_type}: {message}. Entity: {payload}")]
    Write {
        /// Type of entity.
        entity_type: &'static str,
        /// Underlying failure.
        message: String,
        /// JSON rendering of the offending record.
        payload: String,
    },

    /// Composite write failed and was rolled back.
    #[error("Transaction rolled back: {source}. Entities: {entities}")]
    Transaction {
        /// JSON rendering of the records of the transaction.
        entities: String,
        /// Error that triggered the rollback.
        #[source]
        source: Box<RepositoryError>,
    },

    /// A member of a replicated write failed. Earlier members keep their write.
    #[error("Replication failed on member {member} of {members}: {source}")]
    Replication {
        /// Zero-based index of the failed member.
        member: usize,
        /// Number of configured members.
        members: usize,
        /// Error of the failed member.
        #[source]
        source: Box<RepositoryError>,
    },

    /// Operation is not offered by this repository.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Operation exceeded its deadline.
    #[error("Timeout: {operation} exceeded {after:?}")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// Deadline that elapsed.
        after: Duration,
    },

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepositoryError {
    /// Creates a schema provisioning error.
    #[must_use]
    pub fn schema(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaProvisioning {
            object: object.into(),
            message: message.into(),
        }
    }

    /// Creates a write error carrying the serialized record.
    #[must_use]
    pub fn write<T: Serialize>(
        entity_type: &'static str,
        message: impl Into<String>,
        entity: &T,
    ) -> Self {
        Self::Write {
            entity_type,
            message: message.into(),
            payload: to_diagnostic_json(entity),
        }
    }

    /// Creates a transaction error.
    #[must_use]
    pub fn transaction(entities: impl Into<String>, source: RepositoryError) -> Self {
        Self::Transaction {
            entities: entities.into(),
            source: Box::new(source),
        }
    }

    /// Creates a replication error.
    #[must_use]
    pub fn replication(member: usize, members: usize, source: RepositoryError) -> Self {
        Self::Replication {
            member,
            members,
            source: Box::new(source),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a schema provisioning error.
    #[must_use]
    pub fn is_schema_provisioning(&self) -> bool {
        matches!(self, Self::SchemaProvisioning { .. })
    }

    /// Returns true if this is a composite write rollback.
    #[must_use]
    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction { .. })
    }

    /// Returns true if this is a replication failure.
    #[must_use]
    pub fn is_replication(&self) -> bool {
        matches!(self, Self::Replication { .. })
    }

    /// Returns true if this is a deadline expiry.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true if the store could not be reached.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Renders a record as JSON for error messages and logs.
#[must_use]
pub fn to_diagnostic_json<T: Serialize + ?Sized>(entity: &T) -> String {
    serde_json::to_string(entity).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

/// Where filter predicates are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterLocation {
    /// Predicates, ordering and paging are pushed to the storage engine.
    ServerSide,
    /// The whole table is scanned into memory and filtered there. Cost grows
    /// with table size, not page size.
    ClientScan,
}

/// Repository for order lifecycle history.
#[async_trait]
pub trait OrdersHistoryRepository: Send + Sync + fmt::Debug {
    /// Where this repository evaluates filters.
    fn filter_location(&self) -> FilterLocation;

    /// Appends one history row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Write` if the row could not be stored.
    async fn add(&self, order: &OrderHistory) -> RepositoryResult<()>;

    /// Gets every history row of an order.
    ///
    /// With `with_related`, rows of orders attached to it are included.
    /// `status` restricts the result to rows with that status.
    async fn get_history_by_order_id(
        &self,
        order_id: &str,
        status: Option<OrderStatus>,
        with_related: bool,
    ) -> RepositoryResult<Vec<OrderHistory>>;

    /// Gets one page of history rows matching `filter`.
    async fn get_history_by_pages(
        &self,
        filter: &OrderHistoryFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<OrderHistory>>;

    /// Gets every history row matching `filter`, oldest first.
    async fn get_history(&self, filter: &OrderHistoryFilter) -> RepositoryResult<Vec<OrderHistory>> {
        Ok(self
            .get_history_by_pages(filter, None, SortOrder::Ascending)
            .await?
            .contents)
    }
}

/// Repository for closed positions.
#[async_trait]
pub trait PositionsHistoryRepository: Send + Sync + fmt::Debug {
    /// Where this repository evaluates filters.
    fn filter_location(&self) -> FilterLocation;

    /// Stores a position and, when present, the deal it produced.
    ///
    /// Atomic on the relational backend; best-effort on the table store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Transaction` on the relational backend or
    /// `RepositoryError::Write` on the table store.
    async fn add(&self, position: &PositionHistory, deal: Option<&Deal>) -> RepositoryResult<()>;

    /// Gets every history row of a position.
    async fn get(&self, position_id: &str) -> RepositoryResult<Vec<PositionHistory>>;

    /// Gets one page of positions matching `filter`.
    async fn get_by_pages(
        &self,
        filter: &PositionFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<PositionHistory>>;

    /// Gets every position matching `filter`, oldest first.
    async fn get_by_filter(&self, filter: &PositionFilter) -> RepositoryResult<Vec<PositionHistory>> {
        Ok(self
            .get_by_pages(filter, None, SortOrder::Ascending)
            .await?
            .contents)
    }
}

/// Repository for deals. Deals are written through
/// [`PositionsHistoryRepository::add`].
#[async_trait]
pub trait DealsRepository: Send + Sync + fmt::Debug {
    /// Where this repository evaluates filters.
    fn filter_location(&self) -> FilterLocation;

    /// Gets a deal by id.
    async fn get(&self, deal_id: &str) -> RepositoryResult<Option<Deal>>;

    /// Gets one page of deals matching `filter`, ordered by close time.
    async fn get_by_pages(
        &self,
        filter: &DealFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Deal>>;

    /// Gets one page of per-instrument roll-ups of the deals of `account_id`.
    async fn get_aggregated(
        &self,
        account_id: &str,
        filter: &DealFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<AggregatedDeal>>;

    /// Sums the realized PnL of the deals matching `filter`.
    async fn get_total_pnl(&self, filter: &DealFilter) -> RepositoryResult<Decimal>;

    /// Sums the realized PnL of the deals of `account_id` closed on any of `days` (UTC).
    async fn get_total_profit(&self, account_id: &str, days: &[NaiveDate]) -> RepositoryResult<Decimal>;

    /// Gets every deal matching `filter`, oldest first.
    async fn get_by_filter(&self, filter: &DealFilter) -> RepositoryResult<Vec<Deal>> {
        Ok(self
            .get_by_pages(filter, None, SortOrder::Ascending)
            .await?
            .contents)
    }
}

/// Repository for trades.
#[async_trait]
pub trait TradesRepository: Send + Sync + fmt::Debug {
    /// Where this repository evaluates filters.
    fn filter_location(&self) -> FilterLocation;

    /// Appends one trade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Write` if the trade could not be stored.
    async fn add(&self, trade: &Trade) -> RepositoryResult<()>;

    /// Gets a trade by id.
    async fn get(&self, trade_id: &str) -> RepositoryResult<Option<Trade>>;

    /// Gets one page of trades matching `filter`.
    async fn get_by_pages(
        &self,
        filter: &TradeFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Trade>>;

    /// Gets every trade matching `filter`, oldest first.
    async fn get_by_filter(&self, filter: &TradeFilter) -> RepositoryResult<Vec<Trade>> {
        Ok(self
            .get_by_pages(filter, None, SortOrder::Ascending)
            .await?
            .contents)
    }
}
