//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! ## Domain Enums
//!
//! - [`OrderDirection`], [`OrderType`], [`OrderStatus`], [`OriginatorType`],
//!   [`OrderUpdateType`]: order lifecycle attributes
//! - [`PositionDirection`], [`PositionCloseReason`]: position attributes
//! - [`TradeType`]: trade side
//!
//! ## Pagination
//!
//! - [`Page`]: validated skip/take window
//! - [`PaginatedResult`]: one page of a filtered, sorted candidate set
//! - [`SortOrder`]: presentation order on the creation timestamp
//! - [`TimeRange`]: half-open `[start, end)` interval

pub mod enums;
pub mod pagination;

pub use enums::{
    OrderDirection, OrderStatus, OrderType, OrderUpdateType, OriginatorType, ParseEnumError,
    PositionCloseReason, PositionDirection, TradeType,
};
pub use pagination::{Page, PageError, PaginatedResult, SortOrder, TimeRange};
