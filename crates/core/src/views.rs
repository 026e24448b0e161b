//! Viewer identity and the view deduplication window.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Repeat views from one identity inside this window are not counted.
pub const DEDUP_WINDOW_SECS: i64 = 60 * 60;

/// Longest session token accepted as a viewer identity.
pub const MAX_SESSION_TOKEN_LEN: usize = 128;

/// Who viewed a listing: an authenticated user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ViewerIdentity {
    User(DbId),
    Session(String),
}

impl ViewerIdentity {
    /// Pick the identity for a request. An authenticated user always wins
    /// over a session token; blank or oversized tokens are ignored.
    pub fn resolve(user_id: Option<DbId>, session: Option<&str>) -> Option<Self> {
        if let Some(id) = user_id {
            return Some(ViewerIdentity::User(id));
        }
        session
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.len() <= MAX_SESSION_TOKEN_LEN)
            .map(|s| ViewerIdentity::Session(s.to_string()))
    }
}

/// Result of a view recording attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewOutcome {
    /// A new view was stored and the counter incremented.
    Recorded,
    /// The identity viewed the listing within the window; nothing changed.
    Deduplicated,
    /// Tracking failed or the listing is not viewable; logged, not surfaced.
    Skipped,
}

/// Start of the window ending at `now`.
pub fn window_start(now: Timestamp) -> Timestamp {
    now - chrono::Duration::seconds(DEDUP_WINDOW_SECS)
}

/// Whether a previous view at `last` suppresses a view at `now`.
pub fn within_window(last: Timestamp, now: Timestamp) -> bool {
    last > window_start(now)
}
