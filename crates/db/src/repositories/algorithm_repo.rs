//! Repository for the `algorithms` table.

use qbench_core::types::DbId;
use sqlx::PgPool;

use crate::models::algorithm::{Algorithm, CreateAlgorithm};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, name, public, created_at";

/// Provides create and lookup operations for algorithms.
pub struct AlgorithmRepo;

impl AlgorithmRepo {
    /// Insert a new algorithm, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateAlgorithm) -> Result<Algorithm, sqlx::Error> {
        let query = format!(
            "INSERT INTO algorithms (user_id, name, public)
             VALUES ($1, $2, COALESCE($3, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Algorithm>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(input.public)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Algorithm>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM algorithms WHERE id = $1");
        sqlx::query_as::<_, Algorithm>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
