//! # PostgreSQL Backend
//!
//! History repositories on PostgreSQL using sqlx.
//!
//! Filters, ordering and pagination run in the database
//! ([`FilterLocation::ServerSide`](super::traits::FilterLocation)). A page and
//! its total count are read in one `REPEATABLE READ` transaction so both see
//! the same snapshot.
//!
//! Positions with a deal are written through the
//! [`CompositeWriteCoordinator`](crate::application::services::CompositeWriteCoordinator)
//! in a `SERIALIZABLE` transaction.
//!
//! # Examples
//!
//! ```ignore
//! use trading_history::infrastructure::persistence::postgres::PostgresBackend;
//!
//! let backend = PostgresBackend::connect(&settings.storage.relational()?, 1024).await?;
//! let page = backend.deals().get_by_pages(&filter, Some(page), SortOrder::Descending).await?;
//! ```

pub mod commission;
pub mod deals;
pub mod orders;
pub mod positions;
pub mod rows;
pub mod schema;
pub mod trades;

pub use commission::{PgCommissionCalculator, PgLinkedWriteStore};
pub use deals::PgDealsRepository;
pub use orders::PgOrdersHistoryRepository;
pub use positions::PgPositionsHistoryRepository;
pub use trades::PgTradesRepository;

use crate::application::services::{CommissionFollowUp, CompositeWriteCoordinator};
use crate::config::RelationalSettings;
use crate::domain::value_objects::Page;
use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Maps a sqlx error onto the repository error taxonomy.
pub(crate) fn sql_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::connection(e.to_string())
        }
        _ => RepositoryError::query(e.to_string()),
    }
}

/// Appends `LIMIT`/`OFFSET` for a page.
pub(crate) fn push_page(query: &mut QueryBuilder<'static, Postgres>, page: Option<Page>) {
    if let Some(page) = page {
        query
            .push(" LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset_i64());
    }
}

/// Runs a page query and its count query on one snapshot.
pub(crate) async fn fetch_page<R>(
    pool: &PgPool,
    mut page_query: QueryBuilder<'static, Postgres>,
    mut count_query: QueryBuilder<'static, Postgres>,
) -> RepositoryResult<(Vec<R>, u64)>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut tx = pool.begin().await.map_err(sql_error)?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
        .execute(&mut *tx)
        .await
        .map_err(sql_error)?;

    let rows: Vec<R> = page_query
        .build_query_as()
        .fetch_all(&mut *tx)
        .await
        .map_err(sql_error)?;
    let (total,): (i64,) = count_query
        .build_query_as()
        .fetch_one(&mut *tx)
        .await
        .map_err(sql_error)?;

    tx.commit().await.map_err(sql_error)?;
    Ok((rows, total.unsigned_abs()))
}

/// The four relational repositories over one pool.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    orders: Arc<PgOrdersHistoryRepository>,
    positions: Arc<PgPositionsHistoryRepository>,
    deals: Arc<PgDealsRepository>,
    trades: Arc<PgTradesRepository>,
}

impl PostgresBackend {
    /// Connects a pool, provisions the schema and starts the commission worker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Connection` if the database is unreachable,
    /// or `RepositoryError::SchemaProvisioning` if the schema could not be
    /// created.
    pub async fn connect(settings: &RelationalSettings, queue_capacity: usize) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.operation_timeout())
            .connect(&settings.connection_string)
            .await
            .map_err(|e| RepositoryError::connection(e.to_string()))?;
        tracing::info!(max_connections = settings.max_connections, "connected to relational store");
        Self::from_pool(pool, settings.operation_timeout(), queue_capacity).await
    }

    /// Provisions the schema on an existing pool and builds the repositories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::SchemaProvisioning` if the schema could not
    /// be created.
    pub async fn from_pool(pool: PgPool, timeout: Duration, queue_capacity: usize) -> RepositoryResult<Self> {
        schema::provision(&pool).await?;

        let calculator = Arc::new(PgCommissionCalculator::new(pool.clone(), timeout));
        let (follow_up, _worker) = CommissionFollowUp::spawn(calculator, queue_capacity, timeout);
        let coordinator = Arc::new(CompositeWriteCoordinator::new(
            Arc::new(PgLinkedWriteStore::new(pool.clone())),
            follow_up,
            timeout,
        ));

        Ok(Self {
            orders: Arc::new(PgOrdersHistoryRepository::new(pool.clone(), timeout)),
            positions: Arc::new(PgPositionsHistoryRepository::new(pool.clone(), coordinator, timeout)),
            deals: Arc::new(PgDealsRepository::new(pool.clone(), timeout)),
            trades: Arc::new(PgTradesRepository::new(pool.clone(), timeout)),
            pool,
        })
    }

    /// Returns the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Order history repository.
    #[must_use]
    pub fn orders(&self) -> Arc<PgOrdersHistoryRepository> {
        Arc::clone(&self.orders)
    }

    /// Position history repository.
    #[must_use]
    pub fn positions(&self) -> Arc<PgPositionsHistoryRepository> {
        Arc::clone(&self.positions)
    }

    /// Deals repository.
    #[must_use]
    pub fn deals(&self) -> Arc<PgDealsRepository> {
        Arc::clone(&self.deals)
    }

    /// Trades repository.
    #[must_use]
    pub fn trades(&self) -> Arc<PgTradesRepository> {
        Arc::clone(&self.trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_connection_errors() {
        assert!(matches!(sql_error(sqlx::Error::PoolTimedOut), RepositoryError::Connection(_)));
        assert!(matches!(
            sql_error(sqlx::Error::RowNotFound),
            RepositoryError::Query(_)
        ));
    }

    #[test]
    fn page_appends_limit_and_offset() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1");
        push_page(&mut query, Page::new(20, 10).ok());
        assert_eq!(query.sql(), "SELECT 1 LIMIT $1 OFFSET $2");

        let mut query = QueryBuilder::<Postgres>::new("SELECT 1");
        push_page(&mut query, None);
        assert_eq!(query.sql(), "SELECT 1");
    }
}
