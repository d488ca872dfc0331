use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database
    #[error("The episode database is locked by another process. Please try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages
pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Data Structures
// ============================================================================

/// Canonical, store-ready representation of one video.
///
/// `video_id` is the only identity; every other field is replaced wholesale
/// whenever the record is upserted again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub video_id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Relative publish text ("3 weeks ago") frozen at sync time
    pub published_time_text: String,
    /// Publish instant as unix seconds, when the feed supplied a parseable one
    pub published_at: Option<i64>,
    pub length_seconds: i64,
    pub views: i64,
    pub thumbnail_url: String,
    /// Integer flag, 0 or 1
    pub is_live_now: i64,
    pub summary: Option<String>,
}
