//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, and a `Deserialize` create DTO for inserts.

pub mod algorithm;
pub mod algorithm_version;
pub mod metrics;
pub mod molecule;
pub mod user;
