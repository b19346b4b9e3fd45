//! # PostgreSQL Order History
//!
//! Paged reads are one statement:
//!
//! ```text
//! WITH matched    AS (SELECT ... WHERE <clauses>),
//!      candidates AS (SELECT * FROM matched
//!                     UNION ALL
//!                     SELECT ... WHERE parent_order_id IN (SELECT id FROM matched))
//! SELECT ... FROM candidates
//! WHERE parent_order_id = $parent
//! ORDER BY created_timestamp <dir>, oid ASC
//! LIMIT $take OFFSET $skip
//! ```
//!
//! The `UNION ALL` branch is only emitted when related rows are requested.

use super::rows::{ORDER_COLUMNS, OrderRow};
use super::{fetch_page, push_page, sql_error};
use crate::domain::entities::OrderHistory;
use crate::domain::value_objects::{OrderStatus, Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::OrderHistoryFilter;
use crate::infrastructure::persistence::traits::{
    FilterLocation, OrdersHistoryRepository, RepositoryError, RepositoryResult,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;

/// Order history on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgOrdersHistoryRepository {
    pool: PgPool,
    timeout: Duration,
}

fn push_clauses(query: &mut QueryBuilder<'static, Postgres>, filter: &OrderHistoryFilter) {
    if let Some(account) = filter.account() {
        query.push(" AND account_id = ").push_bind(account.to_string());
    }
    if let Some(instrument) = filter.instrument() {
        query.push(" AND instrument = ").push_bind(instrument.to_string());
    }
    if !filter.statuses.is_empty() {
        let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
        query.push(" AND status = ANY(").push_bind(statuses).push(")");
    }
    if !filter.order_types.is_empty() {
        let types: Vec<String> = filter.order_types.iter().map(|t| t.as_str().to_string()).collect();
        query.push(" AND order_type = ANY(").push_bind(types).push(")");
    }
    if !filter.originators.is_empty() {
        let originators: Vec<String> = filter.originators.iter().map(|o| o.as_str().to_string()).collect();
        query.push(" AND originator = ANY(").push_bind(originators).push(")");
    }
    if let Some(start) = filter.created.start {
        query.push(" AND created_timestamp >= ").push_bind(start);
    }
    if let Some(end) = filter.created.end {
        query.push(" AND created_timestamp < ").push_bind(end);
    }
    if let Some(start) = filter.modified.start {
        query.push(" AND modified_timestamp >= ").push_bind(start);
    }
    if let Some(end) = filter.modified.end {
        query.push(" AND modified_timestamp < ").push_bind(end);
    }
}

fn candidates(filter: &OrderHistoryFilter, projection: &str) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("WITH matched AS (SELECT oid, ");
    query.push(ORDER_COLUMNS);
    query.push(" FROM orders_change_history WHERE TRUE");
    push_clauses(&mut query, filter);
    query.push("), candidates AS (SELECT * FROM matched");
    if filter.includes_related() {
        query.push(" UNION ALL SELECT oid, ");
        query.push(ORDER_COLUMNS);
        query.push(" FROM orders_change_history WHERE parent_order_id IN (SELECT id FROM matched)");
    }
    query.push(") SELECT ");
    query.push(projection);
    query.push(" FROM candidates WHERE TRUE");
    if let Some(parent) = filter.parent_order() {
        query.push(" AND parent_order_id = ").push_bind(parent.to_string());
    }
    query
}

/// Builds the page statement.
pub(crate) fn page_query(
    filter: &OrderHistoryFilter,
    page: Option<Page>,
    order: SortOrder,
) -> QueryBuilder<'static, Postgres> {
    let mut query = candidates(filter, ORDER_COLUMNS);
    query.push(" ORDER BY created_timestamp ");
    query.push(order.sql());
    query.push(", oid ASC");
    push_page(&mut query, page);
    query
}

/// Builds the count statement.
pub(crate) fn count_query(filter: &OrderHistoryFilter) -> QueryBuilder<'static, Postgres> {
    candidates(filter, "COUNT(*)")
}

impl PgOrdersHistoryRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn insert(&self, order: &OrderHistory) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders_change_history (
                id, account_id, instrument, parent_order_id, position_id,
                direction, order_type, status, originator, update_type,
                volume, expected_open_price, execution_price, pnl,
                created_timestamp, modified_timestamp, comment
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(&order.id)
        .bind(&order.account_id)
        .bind(&order.instrument)
        .bind(&order.parent_order_id)
        .bind(&order.position_id)
        .bind(order.direction.as_str())
        .bind(order.order_type.as_str())
        .bind(order.status.as_str())
        .bind(order.originator.as_str())
        .bind(order.update_type.as_str())
        .bind(order.volume)
        .bind(order.expected_open_price)
        .bind(order.execution_price)
        .bind(order.pnl)
        .bind(order.created_timestamp)
        .bind(order.modified_timestamp)
        .bind(&order.comment)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, order_id = %order.id, "failed to write order history");
            RepositoryError::write("OrderHistory", e.to_string(), order)
        })?;
        Ok(())
    }
}

#[async_trait]
impl OrdersHistoryRepository for PgOrdersHistoryRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ServerSide
    }

    async fn add(&self, order: &OrderHistory) -> RepositoryResult<()> {
        with_deadline("orders.add", self.timeout, self.insert(order)).await
    }

    async fn get_history_by_order_id(
        &self,
        order_id: &str,
        status: Option<OrderStatus>,
        with_related: bool,
    ) -> RepositoryResult<Vec<OrderHistory>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders_change_history \
             WHERE (id = $1 OR ($2 AND parent_order_id = $1)) \
             AND ($3::TEXT IS NULL OR status = $3) \
             ORDER BY oid ASC"
        );
        with_deadline("orders.get_history_by_order_id", self.timeout, async {
            let rows: Vec<OrderRow> = sqlx::query_as(&sql)
                .bind(order_id)
                .bind(with_related)
                .bind(status.map(OrderStatus::as_str))
                .fetch_all(&self.pool)
                .await
                .map_err(sql_error)?;
            rows.into_iter().map(OrderRow::try_into_order).collect()
        })
        .await
    }

    async fn get_history_by_pages(
        &self,
        filter: &OrderHistoryFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<OrderHistory>> {
        with_deadline("orders.get_history_by_pages", self.timeout, async {
            let (rows, total) =
                fetch_page::<OrderRow>(&self.pool, page_query(filter, page, order), count_query(filter))
                    .await?;
            let contents = rows
                .into_iter()
                .map(OrderRow::try_into_order)
                .collect::<RepositoryResult<Vec<_>>>()?;
            Ok(PaginatedResult::new(contents, page.map_or(0, |p| p.skip()), total))
        })
        .await
    }
}
