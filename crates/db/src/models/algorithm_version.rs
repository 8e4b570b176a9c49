//! Algorithm version entity model and DTOs.

use qbench_core::selection::VersionKey;
use qbench_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `algorithm_versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlgorithmVersion {
    pub id: DbId,
    pub algorithm_id: DbId,
    pub description: String,
    pub circuit: String,
    pub optimizer_module: String,
    pub optimizer_method: String,
    pub timestamp: Timestamp,
}

impl AlgorithmVersion {
    pub fn key(&self) -> VersionKey {
        VersionKey {
            id: self.id,
            timestamp: self.timestamp,
        }
    }
}

/// DTO for creating a version. `timestamp` defaults to `now()`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlgorithmVersion {
    pub algorithm_id: DbId,
    pub description: Option<String>,
    pub circuit: String,
    pub optimizer_module: String,
    pub optimizer_method: String,
    pub timestamp: Option<Timestamp>,
}
