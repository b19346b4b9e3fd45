//! # Linked Writes and Commission Calculation
//!
//! PostgreSQL side of the composite write: a `SERIALIZABLE` transaction over
//! positions, deals and commission seeds, and the calculator the follow-up
//! worker calls after commit.

use super::deals::{insert_commission_seed, insert_deal};
use super::positions::insert_position;
use super::sql_error;
use crate::application::services::{
    CommissionCalculator, CommissionCommand, FollowUpError, LinkedWriteStore, LinkedWriteTx,
};
use crate::domain::entities::{Deal, PositionHistory};
use crate::infrastructure::persistence::deadline::with_deadline;
use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

/// Opens linked-write transactions on a pool.
#[derive(Debug, Clone)]
pub struct PgLinkedWriteStore {
    pool: PgPool,
}

impl PgLinkedWriteStore {
    /// Creates the store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkedWriteStore for PgLinkedWriteStore {
    async fn begin(&self) -> RepositoryResult<Box<dyn LinkedWriteTx>> {
        let mut tx = self.pool.begin().await.map_err(sql_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(sql_error)?;
        Ok(Box::new(PgLinkedWriteTx { tx }))
    }
}

/// One open linked-write transaction.
struct PgLinkedWriteTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LinkedWriteTx for PgLinkedWriteTx {
    async fn insert_position(&mut self, position: &PositionHistory) -> RepositoryResult<()> {
        insert_position(&mut *self.tx, position)
            .await
            .map_err(|e| RepositoryError::write("PositionHistory", e.to_string(), position))
    }

    async fn insert_deal(&mut self, deal: &Deal) -> RepositoryResult<bool> {
        insert_deal(&mut *self.tx, deal)
            .await
            .map_err(|e| RepositoryError::write("Deal", e.to_string(), deal))
    }

    async fn insert_commission_seed(&mut self, deal_id: &str) -> RepositoryResult<()> {
        insert_commission_seed(&mut *self.tx, deal_id)
            .await
            .map_err(|e| RepositoryError::write("DealCommissionParams", e.to_string(), &deal_id))
    }

    async fn commit(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.commit().await.map_err(sql_error)
    }

    async fn rollback(self: Box<Self>) -> RepositoryResult<()> {
        self.tx.rollback().await.map_err(sql_error)
    }
}

/// Calculates commission parameters with the stored procedure.
#[derive(Debug, Clone)]
pub struct PgCommissionCalculator {
    pool: PgPool,
    timeout: Duration,
}

impl PgCommissionCalculator {
    /// Creates the calculator.
    #[must_use]
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

fn follow_up_error(deal_id: &str, e: RepositoryError) -> FollowUpError {
    match e {
        RepositoryError::Connection(_) | RepositoryError::Timeout { .. } => {
            FollowUpError::Unavailable(e.to_string())
        }
        _ => FollowUpError::calculation(deal_id, e.to_string()),
    }
}

#[async_trait]
impl CommissionCalculator for PgCommissionCalculator {
    async fn calculate(&self, command: &CommissionCommand) -> Result<(), FollowUpError> {
        with_deadline("commission.calculate", self.timeout, async {
            sqlx::query("CALL update_deal_commission_params_on_deal($1, $2, $3, $4, $5, $6)")
                .bind(&command.deal_id)
                .bind(&command.open_trade_id)
                .bind(command.open_order_volume)
                .bind(&command.close_trade_id)
                .bind(command.close_order_volume)
                .bind(command.volume)
                .execute(&self.pool)
                .await
                .map_err(sql_error)?;
            Ok(())
        })
        .await
        .map_err(|e| follow_up_error(&command.deal_id, e))
    }
}
