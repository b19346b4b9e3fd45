//! # Backend Selection
//!
//! Builds the configured backends and wires the read and write sides for a
//! [`StorageMode`]:
//!
//! | Mode         | Reads      | Writes                                 |
//! |--------------|------------|----------------------------------------|
//! | `Relational` | PostgreSQL | PostgreSQL                             |
//! | `TableStore` | table store| table store                            |
//! | `Replicated` | PostgreSQL | PostgreSQL, then table store (fan-out) |

use crate::config::{ConfigError, StorageMode, StorageSettings, TableStoreKind, TableStoreSettings};
use crate::infrastructure::persistence::aggregator::RepositoryAggregator;
use crate::infrastructure::persistence::postgres::PostgresBackend;
use crate::infrastructure::persistence::table_store::TableStoreBackend;
use crate::infrastructure::persistence::traits::{
    DealsRepository, FilterLocation, OrdersHistoryRepository, PositionsHistoryRepository,
    RepositoryError, TradesRepository,
};
use std::sync::Arc;
use thiserror::Error;

/// Error while building the storage.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Settings are incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A backend could not be connected or provisioned.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One storage backend.
#[derive(Debug, Clone)]
pub enum HistoryBackend {
    /// PostgreSQL.
    Relational(PostgresBackend),
    /// Partitioned table store.
    TableStore(TableStoreBackend),
}

impl HistoryBackend {
    /// Order history repository.
    #[must_use]
    pub fn orders(&self) -> Arc<dyn OrdersHistoryRepository> {
        match self {
            Self::Relational(backend) => backend.orders() as Arc<dyn OrdersHistoryRepository>,
            Self::TableStore(backend) => backend.orders() as Arc<dyn OrdersHistoryRepository>,
        }
    }

    /// Position history repository.
    #[must_use]
    pub fn positions(&self) -> Arc<dyn PositionsHistoryRepository> {
        match self {
            Self::Relational(backend) => backend.positions() as Arc<dyn PositionsHistoryRepository>,
            Self::TableStore(backend) => backend.positions() as Arc<dyn PositionsHistoryRepository>,
        }
    }

    /// Deals repository.
    #[must_use]
    pub fn deals(&self) -> Arc<dyn DealsRepository> {
        match self {
            Self::Relational(backend) => backend.deals() as Arc<dyn DealsRepository>,
            Self::TableStore(backend) => backend.deals() as Arc<dyn DealsRepository>,
        }
    }

    /// Trades repository.
    #[must_use]
    pub fn trades(&self) -> Arc<dyn TradesRepository> {
        match self {
            Self::Relational(backend) => backend.trades() as Arc<dyn TradesRepository>,
            Self::TableStore(backend) => backend.trades() as Arc<dyn TradesRepository>,
        }
    }

    /// Where this backend evaluates filters.
    #[must_use]
    pub fn filter_location(&self) -> FilterLocation {
        match self {
            Self::Relational(_) => FilterLocation::ServerSide,
            Self::TableStore(_) => FilterLocation::ClientScan,
        }
    }

    /// Connects the table store described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if Redis has no URL, or a connection error.
    pub async fn connect_table_store(settings: &TableStoreSettings) -> Result<Self, BackendError> {
        let backend = match settings.kind {
            TableStoreKind::InMemory => TableStoreBackend::in_memory(settings.operation_timeout()),
            TableStoreKind::Redis => {
                let url = settings.connection_string.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("table_store.connection_string is required for redis".into())
                })?;
                TableStoreBackend::connect_redis(url, settings.operation_timeout()).await?
            }
        };
        Ok(Self::TableStore(backend))
    }
}

/// The read side and the write side of the configured storage.
#[derive(Debug, Clone)]
pub struct HistoryStorage {
    mode: StorageMode,
    reads: HistoryBackend,
    orders_writer: Arc<dyn OrdersHistoryRepository>,
    positions_writer: Arc<dyn PositionsHistoryRepository>,
    trades_writer: Arc<dyn TradesRepository>,
}

impl HistoryStorage {
    /// Connects the backends the settings select.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if a required section is missing or a backend
    /// cannot be connected or provisioned.
    pub async fn from_settings(settings: &StorageSettings) -> Result<Self, BackendError> {
        settings.validate()?;
        let storage = match settings.mode {
            StorageMode::Relational => {
                let relational = PostgresBackend::connect(
                    settings.relational()?,
                    settings.commission_queue_capacity,
                )
                .await?;
                Self::single(HistoryBackend::Relational(relational))
            }
            StorageMode::TableStore => {
                Self::single(HistoryBackend::connect_table_store(settings.table_store()?).await?)
            }
            StorageMode::Replicated => {
                let relational = PostgresBackend::connect(
                    settings.relational()?,
                    settings.commission_queue_capacity,
                )
                .await?;
                let table_store = HistoryBackend::connect_table_store(settings.table_store()?).await?;
                Self::replicated(HistoryBackend::Relational(relational), table_store)
            }
        };
        tracing::info!(mode = ?storage.mode, filter_location = ?storage.reads.filter_location(), "history storage ready");
        Ok(storage)
    }

    /// Reads and writes on one backend.
    #[must_use]
    pub fn single(backend: HistoryBackend) -> Self {
        let mode = match backend {
            HistoryBackend::Relational(_) => StorageMode::Relational,
            HistoryBackend::TableStore(_) => StorageMode::TableStore,
        };
        Self {
            mode,
            orders_writer: backend.orders(),
            positions_writer: backend.positions(),
            trades_writer: backend.trades(),
            reads: backend,
        }
    }

    /// Reads from `primary`; writes to `primary`, then `secondary`.
    #[must_use]
    pub fn replicated(primary: HistoryBackend, secondary: HistoryBackend) -> Self {
        let orders: Vec<Arc<dyn OrdersHistoryRepository>> = vec![primary.orders(), secondary.orders()];
        let positions: Vec<Arc<dyn PositionsHistoryRepository>> =
            vec![primary.positions(), secondary.positions()];
        let trades: Vec<Arc<dyn TradesRepository>> = vec![primary.trades(), secondary.trades()];
        Self {
            mode: StorageMode::Replicated,
            orders_writer: Arc::new(RepositoryAggregator::new(orders)),
            positions_writer: Arc::new(RepositoryAggregator::new(positions)),
            trades_writer: Arc::new(RepositoryAggregator::new(trades)),
            reads: primary,
        }
    }

    /// Configured mode.
    #[must_use]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Backend serving reads.
    #[must_use]
    pub fn reads(&self) -> &HistoryBackend {
        &self.reads
    }

    /// Order history writer.
    #[must_use]
    pub fn orders_writer(&self) -> Arc<dyn OrdersHistoryRepository> {
        Arc::clone(&self.orders_writer)
    }

    /// Position history writer.
    #[must_use]
    pub fn positions_writer(&self) -> Arc<dyn PositionsHistoryRepository> {
        Arc::clone(&self.positions_writer)
    }

    /// Trades writer.
    #[must_use]
    pub fn trades_writer(&self) -> Arc<dyn TradesRepository> {
        Arc::clone(&self.trades_writer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn single_table_store_uses_client_scan() {
        let storage = HistoryStorage::single(HistoryBackend::TableStore(TableStoreBackend::in_memory(
            Duration::from_secs(1),
        )));
        assert_eq!(storage.mode(), StorageMode::TableStore);
        assert_eq!(storage.reads().filter_location(), FilterLocation::ClientScan);
        assert_eq!(storage.orders_writer().filter_location(), FilterLocation::ClientScan);
    }

    #[test]
    fn replicated_reads_from_primary() {
        let primary = HistoryBackend::TableStore(TableStoreBackend::in_memory(Duration::from_secs(1)));
        let secondary = HistoryBackend::TableStore(TableStoreBackend::in_memory(Duration::from_secs(1)));
        let storage = HistoryStorage::replicated(primary, secondary);
        assert_eq!(storage.mode(), StorageMode::Replicated);
    }

    #[tokio::test]
    async fn redis_without_url_is_a_config_error() {
        let settings = TableStoreSettings {
            kind: TableStoreKind::Redis,
            connection_string: None,
            operation_timeout_ms: 100,
        };
        let err = HistoryBackend::connect_table_store(&settings).await.unwrap_err();
        assert!(matches!(err, BackendError::Config(_)));
    }
}
