//! # Application Services
//!
//! Services that orchestrate the repositories.
//!
//! - [`TradingHistoryService`] and [`HistoryIngestor`]: query and ingestion façade
//! - [`CompositeWriteCoordinator`]: atomic position, deal and commission seed writes
//! - [`CommissionFollowUp`]: background commission calculation after commit

pub mod commission_follow_up;
pub mod composite_write;
pub mod trading_history;

pub use commission_follow_up::{
    CommissionCalculator, CommissionCommand, CommissionFollowUp, FollowUpError,
};
pub use composite_write::{CompositeWriteCoordinator, LinkedWriteStore, LinkedWriteTx};
pub use trading_history::{HistoryIngestor, TradingHistoryService};
