//! # Table Storage
//!
//! The partitioned key-value seam the table-store repositories are written
//! against, and the row key generator that orders rows by write time.
//!
//! A row is addressed by `(partition_key, row_key)` inside a named table and
//! carries a JSON payload. Partitions are per account; row keys are
//! ISO-8601 UTC timestamps with microsecond precision:
//!
//! ```text
//! 2024-05-01T12:00:00.000001Z
//! ```
//!
//! Fixed-width keys sort lexicographically in write order.
//!
//! Generated keys are written with [`TableStorage::insert`], which never
//! replaces an existing row. Rows addressed by a stable key, such as the deal
//! id, are written with [`TableStorage::upsert`] so a repeated write lands on
//! the same row.

use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Row key format: ISO-8601 UTC, microseconds.
pub const ROW_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Tables of the table-store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    /// Order history rows.
    OrdersHistory,
    /// Closed positions.
    PositionsHistory,
    /// Deals.
    DealsHistory,
    /// Trades.
    TradesHistory,
}

impl TableName {
    /// Every table.
    pub const ALL: [TableName; 4] = [
        Self::OrdersHistory,
        Self::PositionsHistory,
        Self::DealsHistory,
        Self::TradesHistory,
    ];

    /// Returns the storage name of the table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrdersHistory => "OrdersHistory",
            Self::PositionsHistory => "PositionsHistory",
            Self::DealsHistory => "DealsHistory",
            Self::TradesHistory => "TradesHistory",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Partition the row lives in.
    pub partition_key: String,
    /// Key of the row within its partition.
    pub row_key: String,
    /// Record payload.
    pub payload: serde_json::Value,
}

impl TableRow {
    /// Encodes a record into a row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` if the record cannot be
    /// rendered as JSON.
    pub fn encode<T: Serialize>(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        record: &T,
    ) -> RepositoryResult<Self> {
        let payload =
            serde_json::to_value(record).map_err(|e| RepositoryError::serialization(e.to_string()))?;
        Ok(Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            payload,
        })
    }

    /// Decodes the payload into a record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Serialization` if the payload does not match
    /// the record shape.
    pub fn decode<T: DeserializeOwned>(&self) -> RepositoryResult<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            RepositoryError::serialization(format!(
                "row {}/{}: {e}",
                self.partition_key, self.row_key
            ))
        })
    }
}

/// Partitioned key-value storage.
///
/// Implementations must be safe to share between tasks.
#[async_trait]
pub trait TableStorage: Send + Sync + fmt::Debug {
    /// Inserts or replaces one row.
    ///
    /// # Errors
    ///
    /// Returns a connection or query error if the row was not stored.
    async fn upsert(&self, table: TableName, row: TableRow) -> RepositoryResult<()>;

    /// Stores one row only if its address is free.
    ///
    /// Returns `false` and leaves the stored row untouched when
    /// `(partition_key, row_key)` is taken.
    ///
    /// # Errors
    ///
    /// Returns a connection or query error if the row was not stored.
    async fn insert(&self, table: TableName, row: TableRow) -> RepositoryResult<bool>;

    /// Reads every row of a table ordered by row key, then partition key.
    ///
    /// # Errors
    ///
    /// Returns a connection, query or serialization error.
    async fn scan(&self, table: TableName) -> RepositoryResult<Vec<TableRow>>;
}

/// Generates strictly increasing row keys from the wall clock.
#[derive(Debug, Default)]
pub struct RowKeyGenerator {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl RowKeyGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next row key for the current time.
    pub fn next_key(&self) -> String {
        self.next_key_at(Utc::now())
    }

    /// Returns the next row key for `now`, bumped by one microsecond past the
    /// previous key when the clock has not advanced.
    pub fn next_key_at(&self, now: DateTime<Utc>) -> String {
        let now = now.trunc_subsecs(6);
        let mut last = self.last.lock();
        let next = match *last {
            Some(previous) if now <= previous => previous + TimeDelta::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        next.format(ROW_KEY_FORMAT).to_string()
    }
}
