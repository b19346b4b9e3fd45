//! # Table-Store Backend
//!
//! History repositories over a partitioned key-value [`TableStorage`].
//!
//! Rows are partitioned by account and keyed by a monotonic timestamp from
//! [`RowKeyGenerator`]. The storage offers no secondary indexes, so every
//! read scans its table and evaluates the query in memory
//! ([`FilterLocation::ClientScan`](super::traits::FilterLocation)).
//!
//! A position and its deal are two independent row writes. There is no
//! commission seed and nothing is rolled back. Both rows are keyed by the deal
//! id, so writing the same pair again replaces them instead of adding copies.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use trading_history::infrastructure::persistence::table_store::{
//!     InMemoryTableStorage, TableStoreBackend,
//! };
//!
//! let backend = TableStoreBackend::new(Arc::new(InMemoryTableStorage::new()), Duration::from_secs(5));
//! backend.orders().add(&order).await?;
//! ```

pub mod deals;
pub mod in_memory;
pub mod orders;
pub mod positions;
pub mod redis;
pub mod storage;
pub mod trades;

pub use deals::TableDealsRepository;
pub use in_memory::InMemoryTableStorage;
pub use orders::TableOrdersHistoryRepository;
pub use positions::TablePositionsHistoryRepository;
pub use redis::RedisTableStorage;
pub use storage::{RowKeyGenerator, TableName, TableRow, TableStorage};
pub use trades::TableTradesRepository;

use crate::infrastructure::persistence::query::Keyed;
use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Fresh keys tried before an insert gives up on a crowded partition.
const INSERT_ATTEMPTS: usize = 4;

/// Storage handle shared by the repositories of one backend.
#[derive(Debug, Clone)]
pub struct TableContext {
    storage: Arc<dyn TableStorage>,
    keys: Arc<RowKeyGenerator>,
    timeout: Duration,
}

impl TableContext {
    /// Creates a context with its own row key generator.
    #[must_use]
    pub fn new(storage: Arc<dyn TableStorage>, timeout: Duration) -> Self {
        Self {
            storage,
            keys: Arc::new(RowKeyGenerator::new()),
            timeout,
        }
    }

    /// Returns the operation timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Writes a record under a fresh row key.
    ///
    /// A key already taken in the partition, for instance by another process
    /// sharing the storage, is never overwritten: the write is retried under
    /// the next key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Write` carrying the serialized record.
    pub async fn insert<T: Serialize + Sync>(
        &self,
        table: TableName,
        partition_key: &str,
        entity_type: &'static str,
        record: &T,
    ) -> RepositoryResult<()> {
        for _ in 0..INSERT_ATTEMPTS {
            let row = TableRow::encode(partition_key, self.keys.next_key(), record)?;
            let row_key = row.row_key.clone();
            match self.storage.insert(table, row).await {
                Ok(true) => return Ok(()),
                Ok(false) => tracing::debug!(
                    table = %table,
                    partition_key,
                    row_key = %row_key,
                    "row key taken, retrying under the next key"
                ),
                Err(e) => return Err(write_failed(table, partition_key, &row_key, entity_type, e, record)),
            }
        }
        let e = RepositoryError::query(format!("no free row key after {INSERT_ATTEMPTS} attempts"));
        Err(write_failed(table, partition_key, "-", entity_type, e, record))
    }

    /// Writes a record under a caller-chosen row key, replacing any row
    /// already stored there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Write` carrying the serialized record.
    pub async fn put<T: Serialize + Sync>(
        &self,
        table: TableName,
        partition_key: &str,
        row_key: &str,
        entity_type: &'static str,
        record: &T,
    ) -> RepositoryResult<()> {
        let row = TableRow::encode(partition_key, row_key, record)?;
        self.storage
            .upsert(table, row)
            .await
            .map_err(|e| write_failed(table, partition_key, row_key, entity_type, e, record))
    }

    /// Reads and decodes a whole table in row key order.
    ///
    /// # Errors
    ///
    /// Returns the storage error, or a serialization error for a row whose
    /// payload does not decode.
    pub async fn load<T: DeserializeOwned>(
        &self,
        table: TableName,
    ) -> RepositoryResult<Vec<Keyed<String, T>>> {
        self.storage
            .scan(table)
            .await?
            .into_iter()
            .map(|row| {
                let record = row.decode()?;
                Ok(Keyed::new(row.row_key, record))
            })
            .collect()
    }
}

fn write_failed<T: Serialize>(
    table: TableName,
    partition_key: &str,
    row_key: &str,
    entity_type: &'static str,
    e: RepositoryError,
    record: &T,
) -> RepositoryError {
    tracing::warn!(
        error = %e,
        table = %table,
        partition_key,
        row_key,
        "failed to write {entity_type}"
    );
    RepositoryError::write(entity_type, e.to_string(), record)
}

/// The four table-store repositories over one storage.
#[derive(Debug, Clone)]
pub struct TableStoreBackend {
    orders: Arc<TableOrdersHistoryRepository>,
    positions: Arc<TablePositionsHistoryRepository>,
    deals: Arc<TableDealsRepository>,
    trades: Arc<TableTradesRepository>,
}

impl TableStoreBackend {
    /// Creates the repositories over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn TableStorage>, timeout: Duration) -> Self {
        let context = TableContext::new(storage, timeout);
        Self {
            orders: Arc::new(TableOrdersHistoryRepository::new(context.clone())),
            positions: Arc::new(TablePositionsHistoryRepository::new(context.clone())),
            deals: Arc::new(TableDealsRepository::new(context.clone())),
            trades: Arc::new(TableTradesRepository::new(context)),
        }
    }

    /// Creates the repositories over a fresh in-memory storage.
    #[must_use]
    pub fn in_memory(timeout: Duration) -> Self {
        Self::new(Arc::new(InMemoryTableStorage::new()), timeout)
    }

    /// Connects the repositories to Redis.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` if Redis is unreachable.
    pub async fn connect_redis(url: &str, timeout: Duration) -> RepositoryResult<Self> {
        let storage = RedisTableStorage::connect(url).await?;
        Ok(Self::new(Arc::new(storage), timeout))
    }

    /// Order history repository.
    #[must_use]
    pub fn orders(&self) -> Arc<TableOrdersHistoryRepository> {
        Arc::clone(&self.orders)
    }

    /// Position history repository.
    #[must_use]
    pub fn positions(&self) -> Arc<TablePositionsHistoryRepository> {
        Arc::clone(&self.positions)
    }

    /// Deals repository.
    #[must_use]
    pub fn deals(&self) -> Arc<TableDealsRepository> {
        Arc::clone(&self.deals)
    }

    /// Trades repository.
    #[must_use]
    pub fn trades(&self) -> Arc<TableTradesRepository> {
        Arc::clone(&self.trades)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// In-memory storage whose first `taken` inserts find their key occupied.
    #[derive(Debug, Default)]
    struct CrowdedStorage {
        rows: InMemoryTableStorage,
        taken: Mutex<usize>,
        tried: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TableStorage for CrowdedStorage {
        async fn upsert(&self, table: TableName, row: TableRow) -> RepositoryResult<()> {
            self.rows.upsert(table, row).await
        }

        async fn insert(&self, table: TableName, row: TableRow) -> RepositoryResult<bool> {
            self.tried.lock().push(row.row_key.clone());
            {
                let mut taken = self.taken.lock();
                if *taken > 0 {
                    *taken -= 1;
                    return Ok(false);
                }
            }
            self.rows.insert(table, row).await
        }

        async fn scan(&self, table: TableName) -> RepositoryResult<Vec<TableRow>> {
            self.rows.scan(table).await
        }
    }

    fn crowded(taken: usize) -> (Arc<CrowdedStorage>, TableContext) {
        let storage = Arc::new(CrowdedStorage {
            taken: Mutex::new(taken),
            ..CrowdedStorage::default()
        });
        let context = TableContext::new(storage.clone(), Duration::from_secs(5));
        (storage, context)
    }

    #[tokio::test]
    async fn taken_row_key_is_retried_under_a_new_key() {
        let (storage, context) = crowded(2);
        context
            .insert(TableName::TradesHistory, "A1", "Trade", &serde_json::json!({ "id": "T1" }))
            .await
            .unwrap();

        let tried = storage.tried.lock().clone();
        assert_eq!(tried.len(), 3);
        assert!(tried.windows(2).all(|w| w.first() < w.get(1)));
        let rows = storage.scan(TableName::TradesHistory).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().map(|r| r.row_key.clone()), tried.last().cloned());
    }

    #[tokio::test]
    async fn insert_gives_up_when_every_key_is_taken() {
        let (storage, context) = crowded(INSERT_ATTEMPTS);
        let err = context
            .insert(TableName::TradesHistory, "A1", "Trade", &serde_json::json!({ "id": "T1" }))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Write { entity_type: "Trade", .. }));
        assert_eq!(storage.rows.row_count(), 0);
    }

    #[tokio::test]
    async fn put_replaces_the_row_at_its_key() {
        let (storage, context) = crowded(0);
        for version in [1, 2] {
            context
                .put(TableName::DealsHistory, "A1", "D1", "Deal", &serde_json::json!({ "v": version }))
                .await
                .unwrap();
        }

        let rows = storage.scan(TableName::DealsHistory).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().payload, serde_json::json!({ "v": 2 }));
    }
}
