//! Algorithm entity model and DTOs.

use qbench_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `algorithms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Algorithm {
    pub id: DbId,
    /// Owner of the algorithm.
    pub user_id: DbId,
    pub name: String,
    /// Private algorithms are only visible to their owner.
    pub public: bool,
    pub created_at: Timestamp,
}

impl Algorithm {
    /// Whether `requester` may view this algorithm.
    pub fn is_visible_to(&self, requester: Option<DbId>) -> bool {
        self.public || requester == Some(self.user_id)
    }
}

/// DTO for creating a new algorithm. `public` defaults to `false`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlgorithm {
    pub user_id: DbId,
    pub name: String,
    pub public: Option<bool>,
}
