//! Repository for the `audit_logs` table. Rows are append-only.

use estate_core::audit::AuditRecord;
use estate_core::types::DbId;
use sqlx::PgPool;

pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn insert(pool: &PgPool, record: &AuditRecord) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO audit_logs \
                 (actor_id, action_type, entity_type, entity_id, old_values, new_values, target_user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(record.actor_id)
        .bind(&record.action)
        .bind(&record.entity_type)
        .bind(record.entity_id)
        .bind(&record.old_values)
        .bind(&record.new_values)
        .bind(record.target_user_id)
        .fetch_one(pool)
        .await
    }

    /// Action types recorded for an entity, oldest first.
    pub async fn actions_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT action_type FROM audit_logs \
             WHERE entity_type = $1 AND entity_id = $2 ORDER BY id",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }
}
