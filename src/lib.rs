//! # Trading History
//!
//! Storage and replication layer for the trading history of a margin-trading
//! venue: orders, positions, trades and the deals derived from closed
//! positions.
//!
//! ## Layers
//!
//! - [`domain`]: history records, enums and pagination value objects
//! - [`application`]: validation, the composite position/deal write, the
//!   commission follow-up queue and the service façade used by the ingestion
//!   pipeline and the HTTP layer
//! - [`infrastructure`]: repository contracts and their relational
//!   (PostgreSQL) and table-store (in-memory or Redis) backends, plus the
//!   replication aggregator
//! - [`config`]: settings loading
//! - [`telemetry`]: tracing subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use trading_history::config::Settings;
//! use trading_history::infrastructure::persistence::HistoryStorage;
//! use trading_history::application::services::TradingHistoryService;
//!
//! let settings = Settings::load(None)?;
//! let storage = HistoryStorage::from_settings(&settings.storage).await?;
//! let service = TradingHistoryService::new(&storage);
//! let page = service
//!     .list_deals_paged(Some("A1".into()), None, Default::default(), Some(0), Some(20), false)
//!     .await?;
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;
