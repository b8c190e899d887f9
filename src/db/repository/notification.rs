use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::{NotificationType, Priority, RelatedEventType};
use crate::models::{NewRemoteNotification, RemoteNotification};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Insert a feed row. `read` is always stored as 0: deletion is the only acknowledgment.
pub fn insert_notification(
    conn: &Connection,
    id: &str,
    new: &NewRemoteNotification,
    timestamp: NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO notifications
         (id, user_id, title, message, type, priority, read,
          action_url, related_event_id, related_event_type, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)",
        params![
            id,
            new.user_id,
            new.title,
            new.message,
            new.kind.as_str(),
            new.priority.as_str(),
            new.action_url,
            new.related_event_id,
            new.related_event_type.map(|t| t.as_str()),
            timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// All feed rows for a user, newest first.
pub fn list_notifications_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<RemoteNotification>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, title, message, type, priority,
                action_url, related_event_id, related_event_type, timestamp
         FROM notifications WHERE user_id = ?1
         ORDER BY timestamp DESC",
    )?;

    let rows = stmt.query_map([user_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, String>(9)?,
        ))
    })?;

    let mut notifications = Vec::new();
    for row in rows {
        let (
            id, user_id, title, message, kind, priority,
            action_url, related_event_id, related_event_type, timestamp,
        ) = row?;

        let related_event_type = match related_event_type {
            Some(t) => Some(RelatedEventType::from_str(&t)?),
            None => None,
        };
        let timestamp = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT).map_err(
            |e| DatabaseError::InvalidValue {
                key: format!("notifications.{id}.timestamp"),
                reason: e.to_string(),
            },
        )?;

        notifications.push(RemoteNotification {
            id,
            user_id,
            title,
            message,
            kind: NotificationType::from_str(&kind)?,
            // Rows written by older clients may carry no priority
            priority: Priority::from_str(&priority).unwrap_or(Priority::Medium),
            timestamp,
            action_url,
            related_event_id,
            related_event_type,
        });
    }
    Ok(notifications)
}

/// Owner of a feed row, if it exists.
pub fn get_notification_owner(
    conn: &Connection,
    id: &str,
) -> Result<Option<String>, DatabaseError> {
    match conn.query_row("SELECT user_id FROM notifications WHERE id = ?1", [id], |row| {
        row.get::<_, String>(0)
    }) {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Delete one row. Returns the number of rows removed (0 when already gone).
pub fn delete_notification(conn: &Connection, id: &str) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM notifications WHERE id = ?1", [id])?)
}

pub fn delete_notifications_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM notifications WHERE user_id = ?1", [user_id])?)
}
