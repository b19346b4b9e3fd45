//! # Pagination Value Objects
//!
//! Skip/take windows, sort order, time ranges and paginated results.
//!
//! A [`PaginatedResult`] is always a window over the *fully* filtered and
//! sorted candidate set:
//!
//! ```text
//! contents   = sorted[skip .. skip + take]
//! start      = skip
//! size       = contents.len()
//! total_size = sorted.len()
//! ```
//!
//! # Examples
//!
//! ```
//! use trading_history::domain::value_objects::pagination::{Page, PaginatedResult};
//!
//! let page = Page::new(2, 2).unwrap();
//! let result = PaginatedResult::from_sorted(vec![1, 2, 3, 4, 5], Some(page));
//!
//! assert_eq!(result.contents, vec![3, 4]);
//! assert_eq!(result.start, 2);
//! assert_eq!(result.total_size, 5);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Error returned when a pagination window is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    /// `take` must be strictly positive.
    #[error("take must be > 0, got {0}")]
    NonPositiveTake(i64),

    /// `skip` must not be negative.
    #[error("skip must be >= 0, got {0}")]
    NegativeSkip(i64),
}

/// A validated skip/take window.
///
/// # Invariants
///
/// - `take > 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    skip: u64,
    take: u64,
}

impl Page {
    /// Creates a page window.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if `skip` is negative or `take` is not positive.
    pub fn new(skip: i64, take: i64) -> Result<Self, PageError> {
        if take <= 0 {
            return Err(PageError::NonPositiveTake(take));
        }
        if skip < 0 {
            return Err(PageError::NegativeSkip(skip));
        }
        Ok(Self {
            skip: skip.unsigned_abs(),
            take: take.unsigned_abs(),
        })
    }

    /// Returns the number of leading candidates to skip.
    #[inline]
    #[must_use]
    pub const fn skip(&self) -> u64 {
        self.skip
    }

    /// Returns the maximum number of candidates in the page.
    #[inline]
    #[must_use]
    pub const fn take(&self) -> u64 {
        self.take
    }

    /// Returns `skip` as a SQL `OFFSET` value.
    #[must_use]
    pub fn offset_i64(&self) -> i64 {
        i64::try_from(self.skip).unwrap_or(i64::MAX)
    }

    /// Returns `take` as a SQL `LIMIT` value.
    #[must_use]
    pub fn limit_i64(&self) -> i64 {
        i64::try_from(self.take).unwrap_or(i64::MAX)
    }
}

/// Presentation order applied to the creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    /// Maps the `isAscending` flag of the HTTP boundary.
    #[inline]
    #[must_use]
    pub const fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }

    /// Returns true for [`SortOrder::Ascending`].
    #[inline]
    #[must_use]
    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::Ascending)
    }

    /// Returns the SQL keyword for this order.
    #[inline]
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    /// Applies this order to an ascending comparison.
    #[inline]
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Half-open time interval `[start, end)`; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Creates a range from optional bounds.
    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Returns a range that matches everything.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Returns true if neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns true if `at` lies inside the range.
    #[must_use]
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| *at >= start) && self.end.is_none_or(|end| *at < end)
    }
}

/// One page of a filtered, sorted candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// Records in the page, in presentation order.
    pub contents: Vec<T>,
    /// Index of the first record within the candidate set.
    pub start: u64,
    /// Number of records in the page.
    pub size: u64,
    /// Number of records in the whole candidate set.
    pub total_size: u64,
}

impl<T> PaginatedResult<T> {
    /// Builds a page from already fetched contents and a known total.
    #[must_use]
    pub fn new(contents: Vec<T>, start: u64, total_size: u64) -> Self {
        let size = contents.len() as u64;
        Self {
            contents,
            start,
            size,
            total_size,
        }
    }

    /// Cuts a page out of the fully sorted candidate set.
    ///
    /// Without a page window the whole set is returned.
    #[must_use]
    pub fn from_sorted(sorted: Vec<T>, page: Option<Page>) -> Self {
        let total_size = sorted.len() as u64;
        match page {
            None => Self::new(sorted, 0, total_size),
            Some(page) => {
                let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
                let take = usize::try_from(page.take()).unwrap_or(usize::MAX);
                let contents = sorted.into_iter().skip(skip).take(take).collect();
                Self::new(contents, page.skip(), total_size)
            }
        }
    }

    /// Returns an empty page.
    #[must_use]
    pub fn empty(start: u64) -> Self {
        Self::new(Vec::new(), start, 0)
    }

    /// Transforms the contents while keeping the window metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            contents: self.contents.into_iter().map(f).collect(),
            start: self.start,
            size: self.size,
            total_size: self.total_size,
        }
    }
}
