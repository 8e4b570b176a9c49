//! Molecule entity model and DTOs.

use qbench_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `molecules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Molecule {
    pub id: DbId,
    pub name: String,
    pub structure: String,
    pub basis_set: String,
    pub active_orbitals: String,
    pub transformation: Option<String>,
}

/// Id and name of a molecule that has metrics for some algorithm.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MoleculeSummary {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMolecule {
    pub name: String,
    pub structure: String,
    pub basis_set: String,
    pub active_orbitals: Option<String>,
    pub transformation: Option<String>,
}
