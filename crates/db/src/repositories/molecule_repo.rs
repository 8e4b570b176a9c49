//! Repository for the `molecules` table.

use qbench_core::types::DbId;
use sqlx::PgPool;

use crate::models::molecule::{CreateMolecule, Molecule};

const COLUMNS: &str = "id, name, structure, basis_set, active_orbitals, transformation";

pub struct MoleculeRepo;

impl MoleculeRepo {
    /// Insert a new molecule. An empty transformation is stored as `NULL`.
    pub async fn create(pool: &PgPool, input: &CreateMolecule) -> Result<Molecule, sqlx::Error> {
        let query = format!(
            "INSERT INTO molecules (name, structure, basis_set, active_orbitals, transformation)
             VALUES ($1, $2, $3, COALESCE($4, ''), NULLIF($5, ''))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Molecule>(&query)
            .bind(&input.name)
            .bind(&input.structure)
            .bind(&input.basis_set)
            .bind(&input.active_orbitals)
            .bind(&input.transformation)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Molecule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM molecules WHERE id = $1");
        sqlx::query_as::<_, Molecule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every molecule, ordered by id.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Molecule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM molecules ORDER BY id");
        sqlx::query_as::<_, Molecule>(&query).fetch_all(pool).await
    }
}
