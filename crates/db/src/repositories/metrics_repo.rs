//! Repository for the `metrics` table.

use qbench_core::types::DbId;
use sqlx::PgPool;

use crate::models::metrics::{CreateMetrics, Metrics, VersionMetricsRow};

const COLUMNS: &str = "id, algorithm_version_id, molecule_id, iterations, measurements, \
    circuit_depth, accuracy, qubit_count, success_rate, created_at";

pub struct MetricsRepo;

impl MetricsRepo {
    pub async fn create(pool: &PgPool, input: &CreateMetrics) -> Result<Metrics, sqlx::Error> {
        let query = format!(
            "INSERT INTO metrics
                (algorithm_version_id, molecule_id, iterations, measurements,
                 circuit_depth, accuracy, qubit_count, success_rate)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Metrics>(&query)
            .bind(input.algorithm_version_id)
            .bind(input.molecule_id)
            .bind(input.iterations)
            .bind(input.measurements)
            .bind(input.circuit_depth)
            .bind(input.accuracy)
            .bind(input.qubit_count)
            .bind(input.success_rate)
            .fetch_one(pool)
            .await
    }

    /// List the metrics of every version of an algorithm, ordered by id.
    pub async fn list_by_algorithm(
        pool: &PgPool,
        algorithm_id: DbId,
    ) -> Result<Vec<Metrics>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metrics
             WHERE algorithm_version_id IN (
                 SELECT id FROM algorithm_versions WHERE algorithm_id = $1
             )
             ORDER BY id"
        );
        sqlx::query_as::<_, Metrics>(&query)
            .bind(algorithm_id)
            .fetch_all(pool)
            .await
    }

    /// Every version of the algorithm joined with its metrics for `molecule_id`.
    ///
    /// Versions without such metrics still appear, with `NULL` metric columns.
    /// Rows come back oldest version first.
    pub async fn version_metrics_for_molecule(
        pool: &PgPool,
        algorithm_id: DbId,
        molecule_id: DbId,
    ) -> Result<Vec<VersionMetricsRow>, sqlx::Error> {
        sqlx::query_as::<_, VersionMetricsRow>(
            "SELECT v.id AS version_id, v.\"timestamp\" AS version_timestamp,
                    m.id AS metrics_id, m.iterations, m.measurements,
                    m.circuit_depth, m.accuracy
             FROM algorithm_versions v
             LEFT JOIN metrics m
                ON m.algorithm_version_id = v.id AND m.molecule_id = $2
             WHERE v.algorithm_id = $1
             ORDER BY v.\"timestamp\", v.id, m.id DESC",
        )
        .bind(algorithm_id)
        .bind(molecule_id)
        .fetch_all(pool)
        .await
    }
}
