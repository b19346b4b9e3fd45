//! # Application Errors
//!
//! Error types for the service layer.
//!
//! # Error Hierarchy
//!
//! ```text
//! ApplicationError
//! ├── Validation(ValidationError)   - Malformed request, rejected before storage
//! └── Repository(RepositoryError)   - Storage failure
//! ```
//!
//! # Examples
//!
//! ```
//! use trading_history::application::error::{ApplicationError, ValidationError};
//!
//! let err: ApplicationError = ValidationError::MissingAccount.into();
//! assert!(err.is_client_error());
//! ```

use crate::domain::value_objects::PageError;
use crate::infrastructure::persistence::RepositoryError;
use thiserror::Error;

/// Rejected request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Only one of `skip` and `take` was given.
    #[error("skip and take must be set together (skip: {skip:?}, take: {take:?})")]
    IncompletePaging {
        /// Requested skip.
        skip: Option<i64>,
        /// Requested take.
        take: Option<i64>,
    },

    /// The paging window is malformed.
    #[error(transparent)]
    Page(#[from] PageError),

    /// The account id is required.
    #[error("account id is required")]
    MissingAccount,

    /// An identifier is required.
    #[error("{0} is required")]
    MissingId(&'static str),
}

/// Application layer error.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApplicationError {
    /// Returns true if the caller sent a bad request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Repository(e) => e.is_timeout() || e.is_connection(),
            Self::Validation(_) => false,
        }
    }
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
