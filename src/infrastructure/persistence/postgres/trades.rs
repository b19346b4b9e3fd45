//! # PostgreSQL Trades

use super::rows::{TRADE_COLUMNS, TradeRow};
use super::{fetch_page, push_page, sql_error};
use crate::domain::entities::Trade;
use crate::domain::value_objects::{Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::TradeFilter;
use crate::infrastructure::persistence::traits::{
    FilterLocation, RepositoryError, RepositoryResult, TradesRepository,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;

fn trades_query(filter: &TradeFilter, projection: &str) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT ");
    query.push(projection);
    query.push(" FROM trades WHERE TRUE");
    if let Some(account) = filter.account() {
        query.push(" AND account_id = ").push_bind(account.to_string());
    }
    if let Some(instrument) = filter.instrument() {
        query.push(" AND instrument = ").push_bind(instrument.to_string());
    }
    if let Some(order_id) = filter.order() {
        query.push(" AND order_id = ").push_bind(order_id.to_string());
    }
    if let Some(position_id) = filter.position() {
        query.push(" AND position_id = ").push_bind(position_id.to_string());
    }
    query
}

/// Trades on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgTradesRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PgTradesRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn insert(&self, trade: &Trade) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                id, account_id, order_id, position_id, instrument,
                trade_type, price, volume, trade_timestamp
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.account_id)
        .bind(&trade.order_id)
        .bind(&trade.position_id)
        .bind(&trade.instrument)
        .bind(trade.trade_type.as_str())
        .bind(trade.price)
        .bind(trade.volume)
        .bind(trade.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, trade_id = %trade.id, "failed to write trade");
            RepositoryError::write("Trade", e.to_string(), trade)
        })?;
        Ok(())
    }
}

#[async_trait]
impl TradesRepository for PgTradesRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ServerSide
    }

    async fn add(&self, trade: &Trade) -> RepositoryResult<()> {
        with_deadline("trades.add", self.timeout, self.insert(trade)).await
    }

    async fn get(&self, trade_id: &str) -> RepositoryResult<Option<Trade>> {
        let sql = format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = $1 ORDER BY oid ASC LIMIT 1");
        with_deadline("trades.get", self.timeout, async {
            let row: Option<TradeRow> = sqlx::query_as(&sql)
                .bind(trade_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(sql_error)?;
            row.map(TradeRow::try_into_trade).transpose()
        })
        .await
    }

    async fn get_by_pages(
        &self,
        filter: &TradeFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Trade>> {
        let mut page_query = trades_query(filter, TRADE_COLUMNS);
        page_query.push(" ORDER BY trade_timestamp ");
        page_query.push(order.sql());
        page_query.push(", oid ASC");
        push_page(&mut page_query, page);
        let count_query = trades_query(filter, "COUNT(*)");

        with_deadline("trades.get_by_pages", self.timeout, async {
            let (rows, total) = fetch_page::<TradeRow>(&self.pool, page_query, count_query).await?;
            let contents = rows
                .into_iter()
                .map(TradeRow::try_into_trade)
                .collect::<RepositoryResult<Vec<_>>>()?;
            Ok(PaginatedResult::new(contents, page.map_or(0, |p| p.skip()), total))
        })
        .await
    }
}
