//! # Commission Follow-Up
//!
//! After a position and its deal commit, the commission parameters of the
//! deal are calculated by a background worker. The caller only enqueues a
//! [`CommissionCommand`]; the outcome is logged and never returned.
//!
//! ```text
//! commit ──▶ submit ──▶ [bounded queue] ──▶ worker ──▶ CommissionCalculator
//!              │                                          │
//!              └─ full/closed: logged, dropped            └─ failure or deadline: logged, not retried
//! ```
//!
//! Each calculation runs under a deadline so a stalled store cannot hold the
//! queue.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Inputs for the commission calculation of one deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionCommand {
    /// Deal to calculate.
    pub deal_id: String,
    /// Opening trade.
    pub open_trade_id: String,
    /// Opening order volume.
    pub open_order_volume: Decimal,
    /// Closing trade.
    pub close_trade_id: String,
    /// Closing order volume.
    pub close_order_volume: Decimal,
    /// Closed volume.
    pub volume: Decimal,
}

/// Error of a commission calculation.
#[derive(Debug, Error)]
pub enum FollowUpError {
    /// The calculation ran and failed.
    #[error("Commission calculation failed for deal {deal_id}: {message}")]
    Calculation {
        /// Deal of the failed calculation.
        deal_id: String,
        /// Underlying failure.
        message: String,
    },

    /// The calculator could not reach its store.
    #[error("Commission store unavailable: {0}")]
    Unavailable(String),
}

impl FollowUpError {
    /// Creates a calculation error.
    #[must_use]
    pub fn calculation(deal_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Calculation {
            deal_id: deal_id.into(),
            message: message.into(),
        }
    }
}

/// Calculates and stores the commission parameters of a deal.
#[async_trait]
pub trait CommissionCalculator: Send + Sync + fmt::Debug {
    /// Runs the calculation for one deal.
    ///
    /// # Errors
    ///
    /// Returns [`FollowUpError`] if the parameters were not stored.
    async fn calculate(&self, command: &CommissionCommand) -> Result<(), FollowUpError>;
}

/// Handle to the commission worker queue.
#[derive(Debug, Clone)]
pub struct CommissionFollowUp {
    sender: mpsc::Sender<CommissionCommand>,
}

impl CommissionFollowUp {
    /// Starts the worker and returns its handle.
    ///
    /// The worker stops once every handle is dropped and the queue is drained.
    /// A calculation still running after `timeout` is abandoned and the worker
    /// moves on to the next command.
    #[must_use]
    pub fn spawn(
        calculator: Arc<dyn CommissionCalculator>,
        capacity: usize,
        timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<CommissionCommand>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                let outcome = tokio::time::timeout(timeout, calculator.calculate(&command))
                    .await
                    .unwrap_or_else(|_| {
                        Err(FollowUpError::Unavailable(format!(
                            "calculation exceeded {timeout:?}"
                        )))
                    });
                match outcome {
                    Ok(()) => tracing::debug!(deal_id = %command.deal_id, "commission parameters calculated"),
                    Err(e) => tracing::error!(
                        error = %e,
                        deal_id = %command.deal_id,
                        "commission calculation failed, parameters stay seeded"
                    ),
                }
            }
            tracing::debug!("commission follow-up worker stopped");
        });

        (Self { sender }, worker)
    }

    /// Enqueues a calculation without waiting.
    ///
    /// A full or closed queue is logged and the command is dropped.
    pub fn submit(&self, command: CommissionCommand) {
        match self.sender.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => tracing::warn!(
                deal_id = %command.deal_id,
                "commission queue full, calculation dropped"
            ),
            Err(TrySendError::Closed(command)) => tracing::error!(
                deal_id = %command.deal_id,
                "commission worker stopped, calculation dropped"
            ),
        }
    }
}
