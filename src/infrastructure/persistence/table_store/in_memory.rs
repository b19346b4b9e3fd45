//! # In-Memory Table Storage
//!
//! Process-local [`TableStorage`] used in tests and local runs.
//!
//! # Examples
//!
//! ```
//! use trading_history::infrastructure::persistence::table_store::InMemoryTableStorage;
//!
//! let storage = InMemoryTableStorage::new();
//! assert_eq!(storage.row_count(), 0);
//! ```

use super::storage::{TableName, TableRow, TableStorage};
use crate::infrastructure::persistence::traits::RepositoryResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// In-memory table storage.
///
/// Each table is a [`BTreeMap`] keyed by `(row_key, partition_key)`, so a
/// scan already comes out in row key order.
#[derive(Debug, Default)]
pub struct InMemoryTableStorage {
    tables: DashMap<TableName, BTreeMap<(String, String), serde_json::Value>>,
}

impl InMemoryTableStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows across all tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|entry| entry.value().len()).sum()
    }

    /// Returns the number of rows in one table.
    #[must_use]
    pub fn table_len(&self, table: TableName) -> usize {
        self.tables.get(&table).map_or(0, |rows| rows.len())
    }
}

#[async_trait]
impl TableStorage for InMemoryTableStorage {
    async fn upsert(&self, table: TableName, row: TableRow) -> RepositoryResult<()> {
        self.tables
            .entry(table)
            .or_default()
            .insert((row.row_key, row.partition_key), row.payload);
        Ok(())
    }

    async fn insert(&self, table: TableName, row: TableRow) -> RepositoryResult<bool> {
        let mut rows = self.tables.entry(table).or_default();
        match rows.entry((row.row_key, row.partition_key)) {
            Entry::Vacant(slot) => {
                slot.insert(row.payload);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn scan(&self, table: TableName) -> RepositoryResult<Vec<TableRow>> {
        let Some(rows) = self.tables.get(&table) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .map(|((row_key, partition_key), payload)| TableRow {
                partition_key: partition_key.clone(),
                row_key: row_key.clone(),
                payload: payload.clone(),
            })
            .collect())
    }
}
