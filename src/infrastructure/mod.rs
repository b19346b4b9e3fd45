//! # Infrastructure Layer
//!
//! Storage backends behind the repository contracts.

pub mod persistence;
