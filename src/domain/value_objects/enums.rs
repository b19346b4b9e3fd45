//! # Domain Enums
//!
//! Enumeration types for trading-history records.
//!
//! - [`OrderDirection`] - Buy or Sell order direction
//! - [`OrderType`] - Market, limit and protective order types
//! - [`OrderStatus`] - Order lifecycle status
//! - [`OriginatorType`] - Who initiated an order
//! - [`OrderUpdateType`] - Lifecycle transition that produced a history row
//! - [`PositionDirection`] - Long or Short exposure
//! - [`PositionCloseReason`] - Why a position was closed
//! - [`TradeType`] - Trade side from the investor's perspective
//!
//! Every enum is persisted by name (`"Active"`, `"StopLoss"`, ...). Parsing is
//! case-insensitive so rows written by older producers still load.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a persisted enum with `as_str`, `ALL`, `Display` and `FromStr`.
macro_rules! history_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the persisted name of the variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| ParseEnumError::InvalidValue(stringify!($name), s.to_string()))
            }
        }
    };
}

history_enum! {
    /// Order direction.
    OrderDirection {
        /// Buy order.
        Buy,
        /// Sell order.
        Sell,
    }
}

impl OrderDirection {
    /// Returns the position direction an executed order of this side opens.
    #[inline]
    #[must_use]
    pub const fn position_direction(self) -> PositionDirection {
        match self {
            Self::Buy => PositionDirection::Long,
            Self::Sell => PositionDirection::Short,
        }
    }
}

history_enum! {
    /// Order type.
    OrderType {
        /// Executes immediately at the best available price.
        Market,
        /// Executes at the given price or better.
        Limit,
        /// Becomes a market order once the stop price trades.
        Stop,
        /// Closes a position at a profit target.
        TakeProfit,
        /// Closes a position at a loss limit.
        StopLoss,
        /// Stop loss whose trigger follows the market.
        TrailingStop,
    }
}

history_enum! {
    /// Order lifecycle status.
    OrderStatus {
        /// Accepted but not yet validated.
        Placed,
        /// Waiting for its parent order to execute.
        Inactive,
        /// Working in the market.
        Active,
        /// Execution in progress.
        ExecutionStarted,
        /// Fully executed.
        Executed,
        /// Cancelled by the owner, the broker or the system.
        Canceled,
        /// Rejected during validation or execution.
        Rejected,
        /// Validity period elapsed.
        Expired,
    }
}

impl OrderStatus {
    /// Returns true if no further transitions can follow this status.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Executed | Self::Canceled | Self::Rejected | Self::Expired
        )
    }
}

history_enum! {
    /// Who initiated an order.
    OriginatorType {
        /// The account owner.
        Investor,
        /// The trading platform itself (stop-outs, expirations).
        System,
        /// A broker acting on behalf of the account owner.
        OnBehalf,
    }
}

history_enum! {
    /// Lifecycle transition that produced an order history row.
    OrderUpdateType {
        /// Order placed.
        Place,
        /// Inactive order activated.
        Activate,
        /// Order parameters changed.
        Change,
        /// Order cancelled.
        Cancel,
        /// Order rejected.
        Reject,
        /// Execution started.
        ExecutionStarted,
        /// Order executed.
        Executed,
    }
}

history_enum! {
    /// Net exposure direction of a position.
    PositionDirection {
        /// Long exposure.
        Long,
        /// Short exposure.
        Short,
    }
}

history_enum! {
    /// Why a position was closed.
    PositionCloseReason {
        /// Not closed, or reason unknown.
        None,
        /// Closed by an explicit close order.
        Close,
        /// Closed by a stop loss.
        StopLoss,
        /// Closed by a take profit.
        TakeProfit,
        /// Closed by a margin stop-out.
        StopOut,
    }
}

history_enum! {
    /// Trade side from the investor's perspective.
    TradeType {
        /// Buy trade.
        Buy,
        /// Sell trade.
        Sell,
    }
}

/// Error type for parsing enum values from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    /// The provided string value is not valid for the enum.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(enum_name, value) => {
                write!(f, "invalid {} value: '{}'", enum_name, value)
            }
        }
    }
}

impl std::error::Error for ParseEnumError {}
