//! Repository for the `notifications` table.

use estate_core::notification::NotificationMessage;
use estate_core::roles::ROLE_ADMIN;
use estate_core::types::DbId;
use sqlx::PgPool;

pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn insert(
        pool: &PgPool,
        user_id: DbId,
        message: &NotificationMessage,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO notifications (user_id, title, message, kind, data) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(user_id)
        .bind(&message.title)
        .bind(&message.message)
        .bind(&message.kind)
        .bind(&message.data)
        .fetch_one(pool)
        .await
    }

    /// Fan a message out to every administrator in one statement. Returns
    /// the number of notifications created.
    pub async fn insert_for_admins(
        pool: &PgPool,
        message: &NotificationMessage,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, title, message, kind, data) \
             SELECT id, $2, $3, $4, $5 FROM users WHERE role = $1",
        )
        .bind(ROLE_ADMIN)
        .bind(&message.title)
        .bind(&message.message)
        .bind(&message.kind)
        .bind(&message.data)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Kinds of notifications delivered to a user, oldest first.
    pub async fn kinds_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT kind FROM notifications WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
