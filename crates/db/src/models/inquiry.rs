//! `inquiries` row model (read-only from the catalog's side).

use estate_core::listing::InquirySummary;
use estate_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct InquiryRow {
    pub id: DbId,
    pub sender_name: String,
    pub message: String,
    pub created_at: Timestamp,
}

impl From<InquiryRow> for InquirySummary {
    fn from(row: InquiryRow) -> Self {
        InquirySummary {
            id: row.id,
            sender_name: row.sender_name,
            message: row.message,
            created_at: row.created_at,
        }
    }
}
