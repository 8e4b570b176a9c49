//! Shared domain types for the qbench services.
//!
//! Nothing in this crate touches the database, the network or the
//! filesystem. The worker and the API server both build on it.

pub mod benchmark;
pub mod error;
pub mod selection;
pub mod types;
