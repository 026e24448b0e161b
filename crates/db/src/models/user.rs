//! Public projection of `users` rows.

use estate_core::listing::UserSummary;
use estate_core::types::DbId;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct UserSummaryRow {
    pub id: DbId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<UserSummaryRow> for UserSummary {
    fn from(row: UserSummaryRow) -> Self {
        UserSummary {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
        }
    }
}
