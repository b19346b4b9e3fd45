//! # PostgreSQL Deals
//!
//! Read side of `deals`, the per-instrument roll-up and PnL totals. Deals are
//! inserted together with their position.

use super::rows::{AggregatedDealRow, CommissionParamsRow, DEAL_COLUMNS, DealRow};
use super::{fetch_page, push_page, sql_error};
use crate::domain::entities::{AggregatedDeal, CommissionParams, Deal};
use crate::domain::value_objects::{Page, PaginatedResult, SortOrder};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::query::DealFilter;
use crate::infrastructure::persistence::traits::{DealsRepository, FilterLocation, RepositoryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::time::Duration;

const INSERT_DEAL: &str = r#"
        INSERT INTO deals (
            deal_id, created, account_id, instrument, open_trade_id, open_order_type,
            open_order_volume, open_order_expected_price, close_trade_id, close_order_type,
            close_order_volume, close_order_expected_price, direction, volume, originator,
            open_price, open_fx_price, close_price, close_fx_price, fpl,
            pnl_of_the_last_day, additional_info
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
            $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
        )
        ON CONFLICT (deal_id) DO NOTHING
        "#;

const INSERT_COMMISSION_SEED: &str =
    "INSERT INTO deal_commission_params (deal_id) VALUES ($1) ON CONFLICT (deal_id) DO NOTHING";

/// Inserts one deal row unless the deal id is already stored.
///
/// Returns false if the deal was already there.
pub(crate) async fn insert_deal(conn: &mut PgConnection, deal: &Deal) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(INSERT_DEAL)
        .bind(&deal.deal_id)
        .bind(deal.created)
        .bind(&deal.account_id)
        .bind(&deal.instrument)
        .bind(&deal.open_trade_id)
        .bind(deal.open_order_type.as_str())
        .bind(deal.open_order_volume)
        .bind(deal.open_order_expected_price)
        .bind(&deal.close_trade_id)
        .bind(deal.close_order_type.as_str())
        .bind(deal.close_order_volume)
        .bind(deal.close_order_expected_price)
        .bind(deal.direction.as_str())
        .bind(deal.volume)
        .bind(deal.originator.as_str())
        .bind(deal.open_price)
        .bind(deal.open_fx_price)
        .bind(deal.close_price)
        .bind(deal.close_fx_price)
        .bind(deal.fpl)
        .bind(deal.pnl_of_the_last_day)
        .bind(&deal.additional_info)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Inserts the empty commission row of a deal, if missing.
pub(crate) async fn insert_commission_seed(conn: &mut PgConnection, deal_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_COMMISSION_SEED)
        .bind(deal_id)
        .execute(conn)
        .await?;
    Ok(())
}

fn push_clauses(query: &mut QueryBuilder<'static, Postgres>, filter: &DealFilter) {
    if let Some(account) = filter.account() {
        query.push(" AND account_id = ").push_bind(account.to_string());
    }
    if let Some(instrument) = filter.instrument() {
        query.push(" AND instrument = ").push_bind(instrument.to_string());
    }
    if let Some(start) = filter.close_time.start {
        query.push(" AND created >= ").push_bind(start);
    }
    if let Some(end) = filter.close_time.end {
        query.push(" AND created < ").push_bind(end);
    }
}

fn deals_query(filter: &DealFilter, projection: &str) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("SELECT ");
    query.push(projection);
    query.push(" FROM deals WHERE TRUE");
    push_clauses(&mut query, filter);
    query
}

fn push_grouped(
    query: &mut QueryBuilder<'static, Postgres>,
    account_id: &str,
    filter: &DealFilter,
    projection: &str,
) {
    query.push("SELECT ");
    query.push(projection);
    query.push(" FROM deals WHERE account_id = ");
    query.push_bind(account_id.to_string());
    push_clauses(query, filter);
    query.push(" GROUP BY account_id, instrument");
}

const AGGREGATE_PROJECTION: &str = "account_id, instrument, COUNT(*) AS deals_count, \
    SUM(volume) AS volume, SUM(fpl) AS fpl, SUM(pnl_of_the_last_day) AS pnl_of_the_last_day, \
    MAX(created) AS last_deal_created";

/// Deals on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgDealsRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PgDealsRepository {
    /// Creates the repository.
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Gets the commission parameters of a deal.
    ///
    /// # Errors
    ///
    /// Returns a query error if the lookup failed.
    pub async fn commission_params(&self, deal_id: &str) -> RepositoryResult<Option<CommissionParams>> {
        with_deadline("deals.commission_params", self.timeout, async {
            let row: Option<CommissionParamsRow> = sqlx::query_as(
                r#"
                SELECT deal_id, open_trade_id, close_trade_id, open_order_volume,
                       close_order_volume, volume, calculated_at
                FROM deal_commission_params
                WHERE deal_id = $1
                "#,
            )
            .bind(deal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sql_error)?;
            Ok(row.map(CommissionParams::from))
        })
        .await
    }
}

#[async_trait]
impl DealsRepository for PgDealsRepository {
    fn filter_location(&self) -> FilterLocation {
        FilterLocation::ServerSide
    }

    async fn get(&self, deal_id: &str) -> RepositoryResult<Option<Deal>> {
        let sql = format!("SELECT {DEAL_COLUMNS} FROM deals WHERE deal_id = $1");
        with_deadline("deals.get", self.timeout, async {
            let row: Option<DealRow> = sqlx::query_as(&sql)
                .bind(deal_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(sql_error)?;
            row.map(DealRow::try_into_deal).transpose()
        })
        .await
    }

    async fn get_by_pages(
        &self,
        filter: &DealFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<Deal>> {
        let mut page_query = deals_query(filter, DEAL_COLUMNS);
        page_query.push(" ORDER BY created ");
        page_query.push(order.sql());
        page_query.push(", oid ASC");
        push_page(&mut page_query, page);
        let count_query = deals_query(filter, "COUNT(*)");

        with_deadline("deals.get_by_pages", self.timeout, async {
            let (rows, total) = fetch_page::<DealRow>(&self.pool, page_query, count_query).await?;
            let contents = rows
                .into_iter()
                .map(DealRow::try_into_deal)
                .collect::<RepositoryResult<Vec<_>>>()?;
            Ok(PaginatedResult::new(contents, page.map_or(0, |p| p.skip()), total))
        })
        .await
    }

    async fn get_aggregated(
        &self,
        account_id: &str,
        filter: &DealFilter,
        page: Option<Page>,
        order: SortOrder,
    ) -> RepositoryResult<PaginatedResult<AggregatedDeal>> {
        let mut page_query = QueryBuilder::new("");
        push_grouped(&mut page_query, account_id, filter, AGGREGATE_PROJECTION);
        page_query.push(" ORDER BY last_deal_created ");
        page_query.push(order.sql());
        page_query.push(", instrument ASC");
        push_page(&mut page_query, page);

        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM (");
        push_grouped(&mut count_query, account_id, filter, "1");
        count_query.push(") AS groups");

        with_deadline("deals.get_aggregated", self.timeout, async {
            let (rows, total) = fetch_page::<AggregatedDealRow>(&self.pool, page_query, count_query).await?;
            let contents = rows.into_iter().map(AggregatedDeal::from).collect();
            Ok(PaginatedResult::new(contents, page.map_or(0, |p| p.skip()), total))
        })
        .await
    }

    async fn get_total_pnl(&self, filter: &DealFilter) -> RepositoryResult<Decimal> {
        let mut query = deals_query(filter, "COALESCE(SUM(fpl), 0)");
        with_deadline("deals.get_total_pnl", self.timeout, async {
            let (total,): (Decimal,) = query
                .build_query_as()
                .fetch_one(&self.pool)
                .await
                .map_err(sql_error)?;
            Ok(total)
        })
        .await
    }

    async fn get_total_profit(&self, account_id: &str, days: &[NaiveDate]) -> RepositoryResult<Decimal> {
        with_deadline("deals.get_total_profit", self.timeout, async {
            let (total,): (Decimal,) = sqlx::query_as(
                r#"
                SELECT COALESCE(SUM(fpl), 0)
                FROM deals
                WHERE account_id = $1
                  AND (created AT TIME ZONE 'UTC')::date = ANY($2)
                "#,
            )
            .bind(account_id)
            .bind(days.to_vec())
            .fetch_one(&self.pool)
            .await
            .map_err(sql_error)?;
            Ok(total)
        })
        .await
    }
}
