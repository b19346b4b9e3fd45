//! # Domain Layer
//!
//! History records and the value objects shared by every backend.
//!
//! - [`entities`]: order, position, deal, commission and trade records
//! - [`value_objects`]: domain enums, pagination and time ranges

pub mod entities;
pub mod value_objects;
