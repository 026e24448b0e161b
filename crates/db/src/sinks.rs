//! Table-backed audit and notification collaborators.

use async_trait::async_trait;
use estate_core::audit::AuditRecord;
use estate_core::notification::NotificationMessage;
use estate_core::ports::{AuditSink, Notifier, StoreResult};
use estate_core::types::DbId;

use crate::repositories::{AuditLogRepo, NotificationRepo};
use crate::store::map_sqlx_error;
use crate::DbPool;

/// Writes audit records to `audit_logs`.
#[derive(Clone)]
pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(&self, record: &AuditRecord) -> StoreResult<()> {
        AuditLogRepo::insert(&self.pool, record)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error(e, None))
    }
}

/// Stores in-app notifications in `notifications`.
#[derive(Clone)]
pub struct PgNotifier {
    pool: DbPool,
}

impl PgNotifier {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify_user(&self, user_id: DbId, message: &NotificationMessage) -> StoreResult<()> {
        NotificationRepo::insert(&self.pool, user_id, message)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error(e, None))
    }

    async fn notify_admins(&self, message: &NotificationMessage) -> StoreResult<()> {
        let delivered = NotificationRepo::insert_for_admins(&self.pool, message)
            .await
            .map_err(|e| map_sqlx_error(e, None))?;
        tracing::debug!(delivered, kind = %message.kind, "Admin notification fanned out");
        Ok(())
    }
}
