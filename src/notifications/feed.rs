//! Remote notification feed.
//!
//! The feed owns persisted notification rows. Consumers subscribe per user
//! and receive the full current list on subscribe and after every change.
//! Deleting a row is the only acknowledgment; there is no read flag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::FeedError;
use crate::clock::Clock;
use crate::db::repository::{
    delete_notification, delete_notifications_for_user, get_notification_owner,
    insert_notification, list_notifications_for_user,
};
use crate::db::sqlite::{lock, SharedConnection};
use crate::db::DatabaseError;
use crate::models::enums::{NotificationType, Priority, RelatedEventType};
use crate::models::{Appointment, MedicalRecord, NewRemoteNotification, RemoteNotification, Symptom};

pub type FeedCallback = Box<dyn Fn(Vec<RemoteNotification>) + Send + Sync>;

pub trait RemoteFeed: Send + Sync {
    /// Register `callback` for `user_id`. It is called with the current list
    /// right away and again after every change to that user's rows.
    fn subscribe(&self, user_id: &str, callback: FeedCallback) -> Result<Subscription, FeedError>;

    /// Delete one row. Deleting an id that no longer exists succeeds.
    fn delete(&self, id: &str) -> Result<bool, FeedError>;

    /// Insert a row. The feed assigns id and timestamp.
    fn create(&self, new: NewRemoteNotification) -> Result<String, FeedError>;

    /// Delete every row of `user_id`, returning how many were removed.
    fn delete_all(&self, user_id: &str) -> Result<usize, FeedError>;
}

/// Live registration with a feed. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving updates. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    by_user: HashMap<String, Vec<(u64, Arc<FeedCallback>)>>,
}

impl Subscribers {
    fn remove(&mut self, user_id: &str, id: u64) {
        if let Some(list) = self.by_user.get_mut(user_id) {
            list.retain(|(sub_id, _)| *sub_id != id);
            if list.is_empty() {
                self.by_user.remove(user_id);
            }
        }
    }
}

/// Feed backed by the local `notifications` table with in-process fan-out.
///
/// Snapshot reads and their delivery happen under `delivery`, so a
/// subscriber never receives an older list after a newer one.
pub struct SqliteFeed {
    conn: SharedConnection,
    clock: Arc<dyn Clock>,
    subscribers: Arc<Mutex<Subscribers>>,
    delivery: Mutex<()>,
}

impl SqliteFeed {
    pub fn new(conn: SharedConnection, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn,
            clock,
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            delivery: Mutex::new(()),
        }
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<RemoteNotification>, FeedError> {
        let conn = lock(&self.conn)?;
        Ok(list_notifications_for_user(&conn, user_id)?)
    }

    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.subscribers
            .lock()
            .map(|s| s.by_user.get(user_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock_delivery(&self) -> Result<MutexGuard<'_, ()>, FeedError> {
        self.delivery
            .lock()
            .map_err(|_| FeedError::Storage(DatabaseError::LockPoisoned))
    }

    /// Push the current list to every subscriber of `user_id`.
    /// Callbacks run under the delivery lock only.
    fn publish(&self, user_id: &str) {
        let _delivery = match self.lock_delivery() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::error!(user_id, "Feed delivery lock poisoned");
                return;
            }
        };
        let callbacks: Vec<Arc<FeedCallback>> = match self.subscribers.lock() {
            Ok(subs) => match subs.by_user.get(user_id) {
                Some(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            },
            Err(_) => {
                tracing::error!(user_id, "Feed subscriber registry poisoned");
                return;
            }
        };

        let snapshot = match self.list(user_id) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load feed snapshot for subscribers");
                return;
            }
        };

        for callback in callbacks {
            callback(snapshot.clone());
        }
    }
}

impl RemoteFeed for SqliteFeed {
    fn subscribe(&self, user_id: &str, callback: FeedCallback) -> Result<Subscription, FeedError> {
        let _delivery = self.lock_delivery()?;
        let callback = Arc::new(callback);

        let id = {
            let mut subs = self
                .subscribers
                .lock()
                .map_err(|_| FeedError::Storage(DatabaseError::LockPoisoned))?;
            subs.next_id += 1;
            let id = subs.next_id;
            subs.by_user
                .entry(user_id.to_string())
                .or_default()
                .push((id, callback.clone()));
            id
        };

        let registry: Weak<Mutex<Subscribers>> = Arc::downgrade(&self.subscribers);
        let owner = user_id.to_string();
        let subscription = Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                if let Ok(mut subs) = registry.lock() {
                    subs.remove(&owner, id);
                    tracing::debug!(user_id = %owner, subscription = id, "Feed subscription closed");
                }
            }
        });

        // Registered first: any change from here on is published after this snapshot
        let initial = self.list(user_id)?;
        tracing::debug!(user_id, subscription = id, "Feed subscription opened");
        callback(initial);
        Ok(subscription)
    }

    fn delete(&self, id: &str) -> Result<bool, FeedError> {
        let owner = {
            let conn = lock(&self.conn)?;
            let owner = get_notification_owner(&conn, id)?;
            delete_notification(&conn, id)?;
            owner
        };

        match owner {
            Some(user_id) => {
                tracing::info!(notification_id = id, user_id = %user_id, "Remote notification deleted");
                self.publish(&user_id);
            }
            None => tracing::debug!(notification_id = id, "Remote notification already gone"),
        }
        Ok(true)
    }

    fn create(&self, new: NewRemoteNotification) -> Result<String, FeedError> {
        let id = Uuid::new_v4().to_string();
        {
            let conn = lock(&self.conn)?;
            insert_notification(&conn, &id, &new, self.clock.now())?;
        }
        tracing::info!(notification_id = %id, user_id = %new.user_id, "Remote notification created");
        self.publish(&new.user_id);
        Ok(id)
    }

    fn delete_all(&self, user_id: &str) -> Result<usize, FeedError> {
        let removed = {
            let conn = lock(&self.conn)?;
            delete_notifications_for_user(&conn, user_id)?
        };
        tracing::info!(user_id, removed, "Remote notifications cleared");
        self.publish(user_id);
        Ok(removed)
    }
}

// ── Payloads inserted when patient records are created ─────────────────────

pub fn appointment_created(
    user_id: &str,
    appointment: &Appointment,
    now: NaiveDateTime,
) -> NewRemoteNotification {
    let at = appointment.scheduled_at();
    let upcoming = at.is_some_and(|at| at > now);
    let when = at
        .map(|at| at.format("%-m/%-d/%Y").to_string())
        .unwrap_or_else(|| appointment.date.clone());

    NewRemoteNotification {
        user_id: user_id.to_string(),
        title: (if upcoming { "New Appointment Scheduled" } else { "Appointment Added" }).into(),
        message: format!("{} on {} at {}", appointment.title, when, appointment.time),
        kind: if upcoming { NotificationType::Reminder } else { NotificationType::Info },
        priority: if upcoming { Priority::High } else { Priority::Medium },
        action_url: None,
        related_event_id: Some(appointment.id.clone()),
        related_event_type: Some(RelatedEventType::Appointment),
    }
}

pub fn medical_record_created(user_id: &str, record: &MedicalRecord) -> NewRemoteNotification {
    NewRemoteNotification {
        user_id: user_id.to_string(),
        title: "New Medical Record Added".into(),
        message: format!("{} has been uploaded to your medical records", record.title),
        kind: NotificationType::Success,
        priority: Priority::Medium,
        action_url: None,
        related_event_id: Some(record.id.clone()),
        related_event_type: Some(RelatedEventType::MedicalRecord),
    }
}

pub fn symptom_created(user_id: &str, symptom: &Symptom) -> NewRemoteNotification {
    let priority = match symptom.severity {
        s if s >= 4 => Priority::High,
        3 => Priority::Medium,
        _ => Priority::Low,
    };

    NewRemoteNotification {
        user_id: user_id.to_string(),
        title: "New Symptom Tracked".into(),
        message: format!(
            "{} ({}) has been added to your symptom tracker",
            symptom.name,
            symptom.severity_label()
        ),
        kind: if symptom.is_severe() { NotificationType::Warning } else { NotificationType::Info },
        priority,
        action_url: None,
        related_event_id: Some(symptom.id.clone()),
        related_event_type: Some(RelatedEventType::Symptom),
    }
}
