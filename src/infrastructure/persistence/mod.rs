//! # Persistence Layer
//!
//! Repository contracts and their backends.
//!
//! ## Repository Traits (Ports)
//!
//! - [`OrdersHistoryRepository`]: Order lifecycle history
//! - [`PositionsHistoryRepository`]: Closed positions and their deals
//! - [`DealsRepository`]: Deal reads and roll-ups
//! - [`TradesRepository`]: Executions
//!
//! ## Implementations
//!
//! - `postgres`: Relational backend with server-side filtering and atomic
//!   position/deal writes
//! - `table_store`: Partitioned key-value backend with client-side filtering
//! - `aggregator`: Write-only fan-out over several backends
//! - `backend`: Construction of the configured backends

pub mod aggregator;
pub mod backend;
pub mod deadline;
pub mod postgres;
pub mod query;
pub mod table_store;
pub mod traits;

pub use aggregator::RepositoryAggregator;
pub use backend::{BackendError, HistoryBackend, HistoryStorage};
pub use query::{DealFilter, OrderHistoryFilter, PositionFilter, TradeFilter};
pub use traits::{
    DealsRepository, FilterLocation, OrdersHistoryRepository, PositionsHistoryRepository,
    RepositoryError, RepositoryResult, TradesRepository,
};
