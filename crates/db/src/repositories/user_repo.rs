//! Read access to the `users` table.

use estate_core::roles::ROLE_ADMIN;
use estate_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::UserSummaryRow;

pub struct UserRepo;

impl UserRepo {
    pub async fn find_summary(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<UserSummaryRow>, sqlx::Error> {
        sqlx::query_as::<_, UserSummaryRow>(
            "SELECT id, name, email, phone FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn admin_ids(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM users WHERE role = $1 ORDER BY id")
            .bind(ROLE_ADMIN)
            .fetch_all(pool)
            .await
    }

    /// Insert a user. Used by seeding and tests; accounts are otherwise
    /// managed outside the catalog.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        email: Option<&str>,
        role: &str,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await
    }
}
