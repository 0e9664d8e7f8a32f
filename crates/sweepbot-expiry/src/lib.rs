//! sweepbot-expiry: the deferred message-deletion core.
//!
//! Persists deletion obligations as [`ExpiryRecord`]s and executes them at
//! or after their deadline via periodic sweeps. The store survives process
//! restarts; the sweeper tolerates partial failures.

pub mod delay;
pub mod store;
pub mod sweep;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message scheduled for deletion.
///
/// Records are immutable once written; they are removed by the sweeper
/// after a deletion attempt (success or failure) and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryRecord {
    /// Store-assigned record ID (SQLite rowid; unique, never reused).
    pub id: i64,
    /// Chat the message lives in. Negative IDs are group chats, positive
    /// are private chats, per the Telegram convention.
    pub chat_id: i64,
    /// Message to delete within that chat.
    pub message_id: i64,
    /// UTC instant at or after which the message is eligible for deletion.
    pub delete_at: DateTime<Utc>,
    /// Informational tag (e.g. "del_after_1.5h"); not used for scheduling.
    pub label: String,
}
