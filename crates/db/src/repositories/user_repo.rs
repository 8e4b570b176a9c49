//! Repository for the `users` table.

use sqlx::PgPool;

use crate::models::user::{CreateUser, User};

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username) VALUES ($1) RETURNING id, username, created_at",
        )
        .bind(&input.username)
        .fetch_one(pool)
        .await
    }
}
