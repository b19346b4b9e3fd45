//! # PostgreSQL Position History

use super::rows::{POSITION_COLUMNS, PositionRow};
use super::{fetch_page, push_page, sql_error};
use crate::application::services::CompositeWriteCoordinator;
use crate::domain::entities::{Deal, PositionHistory};
use crate::domain::value_objects::{Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::PositionFilter;
use crate::infrastructure::persistence::traits::{
    FilterLocation, PositionsHistoryRepository, RepositoryResult,
};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Inserts one position row.
pub(crate) async fn insert_position(
    conn: &mut PgConnection,
    position: &PositionHistory,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO positions_history (
            id, account_id, instrument, direction, volume, open_price, close_price,
            open_date, close_date, close_reason, pnl, deal_id, history_timestamp
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(&position.id)
    .bind(&position.account_id)
    .bind(&position.instrument)
    .bind(position.direction.as_str())
    .bind(position.volume)
    .bind(position.open_price)
    .bind(position.close_price)
    .bind(position.open_date)
    .bind(position.close_date)
    .bind(position.close_reason.as_str())
    .bind(position.pnl)
    .bind(&position.deal_id)
    .bind(position.history_timestamp)
    .execute(conn)
    .await?;
    Ok(())
}

fn base_query(filter: &PositionFilter, projection: &str) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT ");
    query.push(projection);
    query.push(" FROM positions_history WHERE TRUE");
    if let Some(account) = filter.account() {
        query.push(" AND account_id = ").push_bind(account.to_string());
    }
    if let Some(instrument) = filter.instrument() {
        query.push(" AND instrument = ").push_bind(instrument.to_string());
    }
    query
}

/// Position history on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgPositionsHistoryRepository {
    pool: PgPool,
    coordinator: Arc<CompositeWriteCoordinator>,
    timeout: Duration,
}

impl PgPositionsHistoryRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(pool: PgPool, coordinator: Arc<CompositeWriteCoordinator>, timeout: Duration) -> Self {
        Self {
            pool,
            coordinator,
            timeout,
        }
    }
}

#[async_trait]
impl PositionsHistoryRepository for PgPositionsHistoryRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ServerSide
    }

    async fn add(&self, position: &PositionHistory, deal: Option<&Deal>) -> RepositoryResult<()> {
        self.coordinator.write(position, deal).await
    }

    async fn get(&self, position_id: &str) -> RepositoryResult<Vec<PositionHistory>> {
        let sql = format!("SELECT {POSITION_COLUMNS} FROM positions_history WHERE id = $1 ORDER BY oid ASC");
        with_deadline("positions.get", self.timeout, async {
            let rows: Vec<PositionRow> = sqlx::query_as(&sql)
                .bind(position_id)
                .fetch_all(&self.pool)
                .await
                .map_err(sql_error)?;
            rows.into_iter().map(PositionRow::try_into_position).collect()
        })
        .await
    }

    async fn get_by_pages(
        &self,
        filter: &PositionFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<PositionHistory>> {
        let mut page_query = base_query(filter, POSITION_COLUMNS);
        page_query.push(" ORDER BY history_timestamp ");
        page_query.push(order.sql());
        page_query.push(", oid ASC");
        push_page(&mut page_query, page);
        let count_query = base_query(filter, "COUNT(*)");

        with_deadline("positions.get_by_pages", self.timeout, async {
            let (rows, total) = fetch_page::<PositionRow>(&self.pool, page_query, count_query).await?;
            let contents = rows
                .into_iter()
                .map(PositionRow::try_into_position)
                .collect::<RepositoryResult<Vec<_>>>()?;
            Ok(PaginatedResult::new(contents, page.map_or(0, |p| p.skip()), total))
        })
        .await
    }
}
