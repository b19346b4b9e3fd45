//! # Composite Write Coordinator
//!
//! Writes a closed position and the deal it produced as one unit.
//!
//! ```text
//! begin ─▶ insert position ─▶ insert deal ─▶ seed commission ─▶ commit ─▶ submit follow-up
//!              │                   │                │
//!              └───────────────────┴────────────────┴──▶ rollback ─▶ Transaction error
//! ```
//!
//! Either every row is visible after the call or none is. The commission
//! calculation runs after the commit and cannot fail the write.
//!
//! A deal closes its position once. When the deal id is already stored the
//! write is a replay of a committed one: the transaction is rolled back and
//! the call succeeds without writing or enqueueing anything.

use crate::application::services::commission_follow_up::{CommissionCommand, CommissionFollowUp};
use crate::domain::entities::{Deal, PositionHistory};
use crate::infrastructure::persistence::traits::{
    RepositoryError, RepositoryResult, to_diagnostic_json,
};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A store that can open transactions spanning positions and deals.
#[async_trait]
pub trait LinkedWriteStore: Send + Sync + fmt::Debug {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns a connection error if no transaction could be opened.
    async fn begin(&self) -> RepositoryResult<Box<dyn LinkedWriteTx>>;
}

/// An open transaction over positions, deals and commission seeds.
#[async_trait]
pub trait LinkedWriteTx: Send {
    /// Inserts a position row.
    async fn insert_position(&mut self, position: &PositionHistory) -> RepositoryResult<()>;

    /// Inserts a deal row unless its deal id is already stored.
    ///
    /// Returns false if the deal was already there.
    async fn insert_deal(&mut self, deal: &Deal) -> RepositoryResult<bool>;

    /// Inserts the empty commission row of a deal, if missing.
    async fn insert_commission_seed(&mut self, deal_id: &str) -> RepositoryResult<()>;

    /// Commits the transaction.
    async fn commit(self: Box<Self>) -> RepositoryResult<()>;

    /// Rolls the transaction back.
    async fn rollback(self: Box<Self>) -> RepositoryResult<()>;
}

/// What staging found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Staged {
    Written,
    Replayed,
}

#[derive(Serialize)]
struct LinkedEntities<'a> {
    position: &'a PositionHistory,
    deal: Option<&'a Deal>,
}

/// Coordinates transactional position and deal writes.
#[derive(Debug, Clone)]
pub struct CompositeWriteCoordinator {
    store: Arc<dyn LinkedWriteStore>,
    follow_up: CommissionFollowUp,
    timeout: Duration,
}

impl CompositeWriteCoordinator {
    /// Creates a coordinator.
    #[must_use]
    pub fn new(store: Arc<dyn LinkedWriteStore>, follow_up: CommissionFollowUp, timeout: Duration) -> Self {
        Self {
            store,
            follow_up,
            timeout,
        }
    }

    /// Writes a position and, if present, its deal and commission seed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Transaction` if any step failed or the
    /// deadline expired. Nothing is visible in that case.
    pub async fn write(&self, position: &PositionHistory, deal: Option<&Deal>) -> RepositoryResult<()> {
        let entities = || to_diagnostic_json(&LinkedEntities { position, deal });

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| self.fail(entities(), e))?;

        let staged = tokio::time::timeout(self.timeout, Self::stage(tx.as_mut(), position, deal)).await;
        let outcome = match staged {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::timeout("positions.add", self.timeout)),
        };

        match outcome {
            Ok(Staged::Written) => {}
            Ok(Staged::Replayed) => {
                tx.rollback().await.map_err(|e| self.fail(entities(), e))?;
                tracing::debug!(
                    position_id = %position.id,
                    deal_id = deal.map(|d| d.deal_id.as_str()),
                    "deal already stored, composite write skipped"
                );
                return Ok(());
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "rollback of composite write failed");
                }
                return Err(self.fail(entities(), e));
            }
        }

        tx.commit().await.map_err(|e| self.fail(entities(), e))?;

        if let Some(deal) = deal {
            self.follow_up.submit(CommissionCommand {
                deal_id: deal.deal_id.clone(),
                open_trade_id: deal.open_trade_id.clone(),
                open_order_volume: deal.open_order_volume,
                close_trade_id: deal.close_trade_id.clone(),
                close_order_volume: deal.close_order_volume,
                volume: deal.volume,
            });
        }
        Ok(())
    }

    async fn stage(
        tx: &mut dyn LinkedWriteTx,
        position: &PositionHistory,
        deal: Option<&Deal>,
    ) -> RepositoryResult<Staged> {
        tx.insert_position(position).await?;
        if let Some(deal) = deal {
            if !tx.insert_deal(deal).await? {
                return Ok(Staged::Replayed);
            }
            tx.insert_commission_seed(&deal.deal_id).await?;
        }
        Ok(Staged::Written)
    }

    fn fail(&self, entities: String, source: RepositoryError) -> RepositoryError {
        tracing::error!(error = %source, entities = %entities, "composite write rolled back");
        RepositoryError::transaction(entities, source)
    }
}
