//! # Relational Schema
//!
//! Idempotent provisioning of the tables, indexes and the commission
//! procedure. Every object is created with `IF NOT EXISTS` or
//! `CREATE OR REPLACE`, so provisioning runs on every start.
//!
//! Every table carries an `oid BIGSERIAL` identity column. It orders rows by
//! insertion and breaks timestamp ties on reads.

use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use sqlx::PgPool;

/// A named schema object and the statement creating it.
#[derive(Debug, Clone, Copy)]
pub struct SchemaObject {
    /// Object name reported on failure.
    pub name: &'static str,
    /// Idempotent DDL.
    pub ddl: &'static str,
}

/// Objects in creation order.
pub const SCHEMA: &[SchemaObject] = &[
    SchemaObject {
        name: "orders_change_history",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS orders_change_history (
                oid BIGSERIAL PRIMARY KEY,
                id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                instrument TEXT NOT NULL,
                parent_order_id TEXT NULL,
                position_id TEXT NULL,
                direction TEXT NOT NULL,
                order_type TEXT NOT NULL,
                status TEXT NOT NULL,
                originator TEXT NOT NULL,
                update_type TEXT NOT NULL,
                volume NUMERIC NOT NULL,
                expected_open_price NUMERIC NULL,
                execution_price NUMERIC NULL,
                pnl NUMERIC NOT NULL,
                created_timestamp TIMESTAMPTZ NOT NULL,
                modified_timestamp TIMESTAMPTZ NOT NULL,
                comment TEXT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_orders_change_history_id
                ON orders_change_history (id);
            CREATE INDEX IF NOT EXISTS ix_orders_change_history_account
                ON orders_change_history (account_id, created_timestamp);
            CREATE INDEX IF NOT EXISTS ix_orders_change_history_parent
                ON orders_change_history (parent_order_id);
        "#,
    },
    SchemaObject {
        name: "positions_history",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS positions_history (
                oid BIGSERIAL PRIMARY KEY,
                id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                instrument TEXT NOT NULL,
                direction TEXT NOT NULL,
                volume NUMERIC NOT NULL,
                open_price NUMERIC NOT NULL,
                close_price NUMERIC NULL,
                open_date TIMESTAMPTZ NOT NULL,
                close_date TIMESTAMPTZ NULL,
                close_reason TEXT NOT NULL,
                pnl NUMERIC NOT NULL,
                deal_id TEXT NULL,
                history_timestamp TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_positions_history_id
                ON positions_history (id);
            CREATE INDEX IF NOT EXISTS ix_positions_history_account
                ON positions_history (account_id, instrument);
        "#,
    },
    SchemaObject {
        name: "deals",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS deals (
                oid BIGSERIAL PRIMARY KEY,
                deal_id TEXT NOT NULL UNIQUE,
                created TIMESTAMPTZ NOT NULL,
                account_id TEXT NOT NULL,
                instrument TEXT NOT NULL,
                open_trade_id TEXT NOT NULL,
                open_order_type TEXT NOT NULL,
                open_order_volume NUMERIC NOT NULL,
                open_order_expected_price NUMERIC NULL,
                close_trade_id TEXT NOT NULL,
                close_order_type TEXT NOT NULL,
                close_order_volume NUMERIC NOT NULL,
                close_order_expected_price NUMERIC NULL,
                direction TEXT NOT NULL,
                volume NUMERIC NOT NULL,
                originator TEXT NOT NULL,
                open_price NUMERIC NOT NULL,
                open_fx_price NUMERIC NOT NULL,
                close_price NUMERIC NOT NULL,
                close_fx_price NUMERIC NOT NULL,
                fpl NUMERIC NOT NULL,
                pnl_of_the_last_day NUMERIC NOT NULL,
                additional_info TEXT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_deals_account
                ON deals (account_id, instrument, created);
        "#,
    },
    SchemaObject {
        name: "deal_commission_params",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS deal_commission_params (
                deal_id TEXT PRIMARY KEY REFERENCES deals (deal_id),
                open_trade_id TEXT NULL,
                close_trade_id TEXT NULL,
                open_order_volume NUMERIC NULL,
                close_order_volume NUMERIC NULL,
                volume NUMERIC NULL,
                calculated_at TIMESTAMPTZ NULL
            );
        "#,
    },
    SchemaObject {
        name: "trades",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS trades (
                oid BIGSERIAL PRIMARY KEY,
                id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                order_id TEXT NOT NULL,
                position_id TEXT NOT NULL,
                instrument TEXT NOT NULL,
                trade_type TEXT NOT NULL,
                price NUMERIC NOT NULL,
                volume NUMERIC NOT NULL,
                trade_timestamp TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_trades_order_position
                ON trades (order_id, position_id);
            CREATE INDEX IF NOT EXISTS ix_trades_id
                ON trades (id);
        "#,
    },
    SchemaObject {
        name: "update_deal_commission_params_on_deal",
        ddl: r#"
            CREATE OR REPLACE PROCEDURE update_deal_commission_params_on_deal(
                p_deal_id TEXT,
                p_open_trade_id TEXT,
                p_open_order_volume NUMERIC,
                p_close_trade_id TEXT,
                p_close_order_volume NUMERIC,
                p_volume NUMERIC
            )
            LANGUAGE plpgsql
            AS $$
            BEGIN
                UPDATE deal_commission_params
                SET open_trade_id = p_open_trade_id,
                    open_order_volume = p_open_order_volume,
                    close_trade_id = p_close_trade_id,
                    close_order_volume = p_close_order_volume,
                    volume = p_volume,
                    calculated_at = now()
                WHERE deal_id = p_deal_id;

                IF NOT FOUND THEN
                    RAISE EXCEPTION 'commission params of deal % were not seeded', p_deal_id;
                END IF;
            END;
            $$;
        "#,
    },
];

/// Creates every schema object that does not exist yet.
///
/// # Errors
///
/// Returns `RepositoryError::SchemaProvisioning` naming the first object
/// that could not be created.
pub async fn provision(pool: &PgPool) -> RepositoryResult<()> {
    for object in SCHEMA {
        sqlx::raw_sql(object.ddl).execute(pool).await.map_err(|e| {
            tracing::error!(error = %e, object = object.name, "schema provisioning failed");
            RepositoryError::schema(object.name, e.to_string())
        })?;
        tracing::debug!(object = object.name, "schema object provisioned");
    }
    Ok(())
}
