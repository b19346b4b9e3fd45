//! # Application Layer
//!
//! Request validation and the services in front of the storage backends.

pub mod error;
pub mod services;
pub mod validation;

pub use error::{ApplicationError, ApplicationResult, ValidationError};
