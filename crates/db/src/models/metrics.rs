//! Metrics entity model, DTOs and the chart join row.

use qbench_core::selection::{ChartMeasurements, JoinedMetrics, MetricsKey, VersionKey};
use qbench_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `metrics` table.
///
/// Measurement columns stay `NULL` until the benchmark result arrives.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Metrics {
    pub id: DbId,
    pub algorithm_version_id: DbId,
    pub molecule_id: DbId,
    pub iterations: Option<f64>,
    pub measurements: Option<i64>,
    pub circuit_depth: Option<i32>,
    pub accuracy: Option<f64>,
    pub qubit_count: Option<i32>,
    pub success_rate: Option<f64>,
    pub created_at: Timestamp,
}

impl Metrics {
    pub fn key(&self) -> MetricsKey {
        MetricsKey {
            id: self.id,
            version_id: self.algorithm_version_id,
            molecule_id: self.molecule_id,
        }
    }
}

/// DTO for creating a metrics record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMetrics {
    pub algorithm_version_id: DbId,
    pub molecule_id: DbId,
    pub iterations: Option<f64>,
    pub measurements: Option<i64>,
    pub circuit_depth: Option<i32>,
    pub accuracy: Option<f64>,
    pub qubit_count: Option<i32>,
    pub success_rate: Option<f64>,
}

/// One row of `algorithm_versions LEFT JOIN metrics` for a single molecule.
#[derive(Debug, Clone, FromRow)]
pub struct VersionMetricsRow {
    pub version_id: DbId,
    pub version_timestamp: Timestamp,
    pub metrics_id: Option<DbId>,
    pub iterations: Option<f64>,
    pub measurements: Option<i64>,
    pub circuit_depth: Option<i32>,
    pub accuracy: Option<f64>,
}

impl VersionMetricsRow {
    pub fn into_joined(self) -> JoinedMetrics {
        JoinedMetrics {
            version: VersionKey {
                id: self.version_id,
                timestamp: self.version_timestamp,
            },
            metrics_id: self.metrics_id,
            values: ChartMeasurements {
                iterations: self.iterations,
                measurements: self.measurements,
                circuit_depth: self.circuit_depth,
                accuracy: self.accuracy,
            },
        }
    }
}
