//! # Redis Table Storage
//!
//! [`TableStorage`] on Redis through a multiplexed [`ConnectionManager`].
//!
//! ## Key layout
//!
//! ```text
//! {table}:partitions            SET   partition keys of the table
//! {table}:p:{partition_key}     HASH  row_key -> JSON payload
//! ```
//!
//! Writes update both keys in one `MULTI`/`EXEC` pipeline. An insert uses
//! `HSETNX`, so a taken row key is reported instead of overwritten.

use super::storage::{TableName, TableRow, TableStorage};
use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::fmt;

/// Redis-backed table storage.
#[derive(Clone)]
pub struct RedisTableStorage {
    connection: ConnectionManager,
}

impl fmt::Debug for RedisTableStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisTableStorage").finish_non_exhaustive()
    }
}

impl RedisTableStorage {
    /// Connects to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` if the URL is invalid or the
    /// server is unreachable.
    pub async fn connect(url: &str) -> RepositoryResult<Self> {
        let client = redis::Client::open(url).map_err(|e| RepositoryError::connection(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| RepositoryError::connection(e.to_string()))?;
        tracing::debug!("connected table storage to redis");
        Ok(Self { connection })
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    fn partitions_key(table: TableName) -> String {
        format!("{table}:partitions")
    }

    fn partition_key(table: TableName, partition: &str) -> String {
        format!("{table}:p:{partition}")
    }
}

fn redis_error(e: redis::RedisError) -> RepositoryError {
    RepositoryError::query(e.to_string())
}

#[async_trait]
impl TableStorage for RedisTableStorage {
    async fn upsert(&self, table: TableName, row: TableRow) -> RepositoryResult<()> {
        let payload =
            serde_json::to_string(&row.payload).map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let mut conn = self.connection.clone();
        redis::pipe()
            .atomic()
            .sadd(Self::partitions_key(table), &row.partition_key)
            .ignore()
            .hset(Self::partition_key(table, &row.partition_key), &row.row_key, payload)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(redis_error)
    }

    async fn insert(&self, table: TableName, row: TableRow) -> RepositoryResult<bool> {
        let payload =
            serde_json::to_string(&row.payload).map_err(|e| RepositoryError::serialization(e.to_string()))?;
        let mut conn = self.connection.clone();
        let (created,): (bool,) = redis::pipe()
            .atomic()
            .sadd(Self::partitions_key(table), &row.partition_key)
            .ignore()
            .hset_nx(Self::partition_key(table, &row.partition_key), &row.row_key, payload)
            .query_async(&mut conn)
            .await
            .map_err(redis_error)?;
        Ok(created)
    }

    async fn scan(&self, table: TableName) -> RepositoryResult<Vec<TableRow>> {
        let mut conn = self.connection.clone();
        let partitions: Vec<String> = conn
            .smembers(Self::partitions_key(table))
            .await
            .map_err(redis_error)?;

        let mut rows = Vec::new();
        for partition in partitions {
            let entries: HashMap<String, String> = conn
                .hgetall(Self::partition_key(table, &partition))
                .await
                .map_err(redis_error)?;
            for (row_key, raw) in entries {
                let payload = serde_json::from_str(&raw).map_err(|e| {
                    RepositoryError::serialization(format!("row {partition}/{row_key}: {e}"))
                })?;
                rows.push(TableRow {
                    partition_key: partition.clone(),
                    row_key,
                    payload,
                });
            }
        }
        rows.sort_by(|a, b| {
            a.row_key
                .cmp(&b.row_key)
                .then_with(|| a.partition_key.cmp(&b.partition_key))
        });
        Ok(rows)
    }
}
