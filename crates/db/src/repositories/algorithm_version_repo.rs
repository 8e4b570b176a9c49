//! Repository for the `algorithm_versions` table.

use qbench_core::types::DbId;
use sqlx::PgPool;

use crate::models::algorithm_version::{AlgorithmVersion, CreateAlgorithmVersion};

const COLUMNS: &str =
    "id, algorithm_id, description, circuit, optimizer_module, optimizer_method, \"timestamp\"";

pub struct AlgorithmVersionRepo;

impl AlgorithmVersionRepo {
    /// Insert a new version. A missing `timestamp` defaults to `now()`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAlgorithmVersion,
    ) -> Result<AlgorithmVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO algorithm_versions
                (algorithm_id, description, circuit, optimizer_module, optimizer_method, \"timestamp\")
             VALUES ($1, COALESCE($2, ''), $3, $4, $5, COALESCE($6, now()))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlgorithmVersion>(&query)
            .bind(input.algorithm_id)
            .bind(&input.description)
            .bind(&input.circuit)
            .bind(&input.optimizer_module)
            .bind(&input.optimizer_method)
            .bind(input.timestamp)
            .fetch_one(pool)
            .await
    }

    /// List the versions of an algorithm, most recent first.
    pub async fn list_by_algorithm(
        pool: &PgPool,
        algorithm_id: DbId,
    ) -> Result<Vec<AlgorithmVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM algorithm_versions
             WHERE algorithm_id = $1
             ORDER BY \"timestamp\" DESC, id DESC"
        );
        sqlx::query_as::<_, AlgorithmVersion>(&query)
            .bind(algorithm_id)
            .fetch_all(pool)
            .await
    }
}
