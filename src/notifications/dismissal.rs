//! Per-user dismissed notification ids.
//!
//! Stored in `user_preferences` under `dismissedNotifications_{userId}` as a
//! JSON array of ids, oldest first. Writes are set unions. When a cap is
//! configured the oldest ids are evicted once it is exceeded.

use std::collections::HashSet;

use super::NotifyError;
use crate::db::repository::{get_user_preference, set_user_preference};
use crate::db::sqlite::{lock, SharedConnection};

pub trait DismissalStore: Send + Sync {
    /// Every id dismissed by `user_id`.
    fn dismissed(&self, user_id: &str) -> Result<HashSet<String>, NotifyError>;

    /// Add `notification_id` to the user's set. Dismissing twice is a no-op.
    fn dismiss(&self, user_id: &str, notification_id: &str) -> Result<(), NotifyError>;

    fn is_dismissed(&self, user_id: &str, notification_id: &str) -> Result<bool, NotifyError> {
        Ok(self.dismissed(user_id)?.contains(notification_id))
    }
}

pub fn storage_key(user_id: &str) -> String {
    format!("dismissedNotifications_{user_id}")
}

pub struct SqliteDismissalStore {
    conn: SharedConnection,
    /// 0 keeps every id.
    cap: usize,
}

impl SqliteDismissalStore {
    pub fn new(conn: SharedConnection, cap: usize) -> Self {
        Self { conn, cap }
    }

    fn load(conn: &rusqlite::Connection, user_id: &str) -> Result<Vec<String>, NotifyError> {
        let Some(raw) = get_user_preference(conn, &storage_key(user_id))? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Ok(ids),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Unreadable dismissal set, treating as empty");
                Ok(Vec::new())
            }
        }
    }
}

impl DismissalStore for SqliteDismissalStore {
    fn dismissed(&self, user_id: &str) -> Result<HashSet<String>, NotifyError> {
        let conn = lock(&self.conn)?;
        Ok(Self::load(&conn, user_id)?.into_iter().collect())
    }

    fn dismiss(&self, user_id: &str, notification_id: &str) -> Result<(), NotifyError> {
        // Read-modify-write under the connection lock
        let conn = lock(&self.conn)?;
        let mut ids = Self::load(&conn, user_id)?;
        if ids.iter().any(|id| id == notification_id) {
            return Ok(());
        }
        ids.push(notification_id.to_string());

        if self.cap > 0 && ids.len() > self.cap {
            let excess = ids.len() - self.cap;
            ids.drain(..excess);
            tracing::debug!(user_id, evicted = excess, "Dismissal set trimmed to cap");
        }

        let value = serde_json::to_string(&ids)?;
        set_user_preference(&conn, &storage_key(user_id), &value)?;
        tracing::info!(user_id, notification_id, "Notification dismissed");
        Ok(())
    }
}
