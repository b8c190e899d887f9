//! Notification center: merges generated and remote notifications for one patient.
//!
//! Every change to the patient's records or to the remote snapshot triggers a
//! full recompute: regenerate, drop dismissed ids, append the remote list,
//! sort newest first, publish. Consumers read the latest
//! `NotificationSummary` or follow it through a `watch` channel.
//!
//! Nothing here ever marks an item read. Removing an item is the only
//! acknowledgment, so every listed item counts as unread.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use tokio::sync::watch;

use super::dismissal::DismissalStore;
use super::feed::{FeedCallback, RemoteFeed, Subscription};
use super::generator::generate;
use super::NotifyError;
use crate::clock::Clock;
use crate::db::DatabaseError;
use crate::models::{Notification, NotificationSummary, PatientSources, RemoteNotification};

/// What `delete_notification` did with the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Generated item added to the user's dismissal set.
    Dismissed,
    /// Remote row deleted by the feed.
    Deleted,
    /// Feed delete failed; hidden until the next remote snapshot.
    RemovedLocally,
}

#[derive(Default)]
struct CenterState {
    sources: PatientSources,
    remote: Vec<RemoteNotification>,
    /// Remote ids whose delete failed. Cleared on every new remote snapshot.
    hidden: HashSet<String>,
    /// Generated ids dismissed by this center. Filtered on every recompute,
    /// even when the dismissal set was read before the dismissal landed.
    dismissed: HashSet<String>,
    current: Vec<Notification>,
}

struct CenterInner {
    user_id: String,
    clock: Arc<dyn Clock>,
    dismissals: Arc<dyn DismissalStore>,
    feed: Arc<dyn RemoteFeed>,
    state: Mutex<CenterState>,
    subscription: Mutex<Option<Subscription>>,
    stopped: AtomicBool,
    tx: watch::Sender<NotificationSummary>,
}

#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<CenterInner>,
}

impl NotificationCenter {
    pub fn new(
        user_id: impl Into<String>,
        sources: PatientSources,
        clock: Arc<dyn Clock>,
        dismissals: Arc<dyn DismissalStore>,
        feed: Arc<dyn RemoteFeed>,
    ) -> Self {
        let (tx, _rx) = watch::channel(NotificationSummary::loading());
        Self {
            inner: Arc::new(CenterInner {
                user_id: user_id.into(),
                clock,
                dismissals,
                feed,
                state: Mutex::new(CenterState {
                    sources,
                    ..CenterState::default()
                }),
                subscription: Mutex::new(None),
                stopped: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Subscribe to the remote feed and publish the first merged list.
    ///
    /// A failed subscription is logged and the center serves generated
    /// notifications only.
    pub fn start(&self) {
        let weak: Weak<CenterInner> = Arc::downgrade(&self.inner);
        let callback: FeedCallback = Box::new(move |remote: Vec<RemoteNotification>| {
            if let Some(inner) = weak.upgrade() {
                inner.on_remote_snapshot(remote);
            }
        });

        match self.inner.feed.subscribe(&self.inner.user_id, callback) {
            Ok(subscription) => {
                match self.inner.subscription.lock() {
                    Ok(mut slot) => *slot = Some(subscription),
                    Err(_) => tracing::error!(user_id = %self.inner.user_id, "Subscription slot poisoned"),
                }
                tracing::info!(user_id = %self.inner.user_id, "Notification center started");
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %self.inner.user_id,
                    error = %e,
                    "Remote feed unavailable, serving generated notifications only"
                );
                self.inner.recompute();
            }
        }
    }

    /// Replace the patient's records and recompute.
    pub fn set_sources(&self, sources: PatientSources) {
        if let Ok(mut state) = self.inner.state() {
            state.sources = sources;
        }
        self.inner.recompute();
    }

    /// Edit the patient's records in place under the state lock and
    /// recompute. Returns the records as edited.
    pub fn modify_sources(
        &self,
        edit: impl FnOnce(&mut PatientSources),
    ) -> Result<PatientSources, NotifyError> {
        let edited = {
            let mut state = self.inner.state()?;
            edit(&mut state.sources);
            state.sources.clone()
        };
        self.inner.recompute();
        Ok(edited)
    }

    pub fn sources(&self) -> PatientSources {
        self.inner
            .state()
            .map(|s| s.sources.clone())
            .unwrap_or_default()
    }

    /// Recompute against the current clock so time windows advance.
    pub fn refresh(&self) {
        self.inner.recompute();
    }

    pub fn summary(&self) -> NotificationSummary {
        self.inner.tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<NotificationSummary> {
        self.inner.tx.subscribe()
    }

    /// Case-insensitive match on title or message. An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<Notification> {
        let needle = term.trim().to_lowercase();
        self.summary()
            .notifications
            .into_iter()
            .filter(|n| {
                needle.is_empty()
                    || n.title.to_lowercase().contains(&needle)
                    || n.message.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Remove one notification from the patient's list.
    ///
    /// Generated items are dismissed permanently. Anything else is deleted
    /// from the remote feed on the blocking pool. A failed remote delete is
    /// logged and the item is hidden locally.
    pub async fn delete_notification(&self, id: &str) -> Result<DeleteOutcome, NotifyError> {
        let inner = &self.inner;
        inner.ensure_running()?;

        let generated = inner
            .state()?
            .current
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.is_generated);

        if generated == Some(true) {
            inner.dismissals.dismiss(&inner.user_id, id)?;
            {
                let mut state = inner.state()?;
                state.dismissed.insert(id.to_string());
                state.current.retain(|n| n.id != id);
                inner.publish(state.current.clone());
            }
            return Ok(DeleteOutcome::Dismissed);
        }

        let feed = inner.feed.clone();
        let target = id.to_string();
        let result = tokio::task::spawn_blocking(move || feed.delete(&target)).await;

        let failure = match result {
            Ok(Ok(true)) => {
                tracing::info!(user_id = %inner.user_id, notification_id = id, "Remote notification removed");
                return Ok(DeleteOutcome::Deleted);
            }
            Ok(Ok(false)) => "feed reported failure".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("delete task failed: {e}"),
        };

        tracing::warn!(
            user_id = %inner.user_id,
            notification_id = id,
            reason = %failure,
            "Remote delete failed, hiding notification locally"
        );
        {
            let mut state = inner.state()?;
            state.hidden.insert(id.to_string());
            state.current.retain(|n| n.id != id);
            inner.publish(state.current.clone());
        }
        Ok(DeleteOutcome::RemovedLocally)
    }

    /// Dismiss every listed generated item and delete every remote row.
    /// Returns how many items were cleared.
    ///
    /// If the feed cannot delete, the remote items are hidden locally until
    /// the next remote snapshot, as with a single failed delete.
    pub async fn clear_all(&self) -> Result<usize, NotifyError> {
        let inner = &self.inner;
        inner.ensure_running()?;

        let generated: Vec<String> = inner
            .state()?
            .current
            .iter()
            .filter(|n| n.is_generated)
            .map(|n| n.id.clone())
            .collect();
        for id in &generated {
            inner.dismissals.dismiss(&inner.user_id, id)?;
        }
        inner.state()?.dismissed.extend(generated.iter().cloned());

        let feed = inner.feed.clone();
        let user_id = inner.user_id.clone();
        let removed = match tokio::task::spawn_blocking(move || feed.delete_all(&user_id)).await {
            Ok(Ok(removed)) => removed,
            Ok(Err(e)) => inner.hide_remote(&e.to_string())?,
            Err(e) => inner.hide_remote(&format!("delete task failed: {e}"))?,
        };

        inner.recompute();
        tracing::info!(
            user_id = %inner.user_id,
            dismissed = generated.len(),
            deleted = removed,
            "Notifications cleared"
        );
        Ok(generated.len() + removed)
    }

    /// Release the feed subscription. Safe to call more than once.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut slot) = self.inner.subscription.lock() {
            if let Some(mut subscription) = slot.take() {
                subscription.unsubscribe();
            }
        }
        tracing::info!(user_id = %self.inner.user_id, "Notification center stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}

impl CenterInner {
    fn state(&self) -> Result<MutexGuard<'_, CenterState>, DatabaseError> {
        self.state.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    fn ensure_running(&self) -> Result<(), NotifyError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(NotifyError::Stopped(self.user_id.clone()));
        }
        Ok(())
    }

    /// Hide every remote item currently held. Returns how many were hidden.
    fn hide_remote(&self, reason: &str) -> Result<usize, DatabaseError> {
        let mut state = self.state()?;
        let ids: Vec<String> = state.remote.iter().map(|r| r.id.clone()).collect();
        tracing::warn!(
            user_id = %self.user_id,
            count = ids.len(),
            reason,
            "Remote clear failed, hiding notifications locally"
        );
        state.hidden.extend(ids.iter().cloned());
        Ok(ids.len())
    }

    fn on_remote_snapshot(&self, remote: Vec<RemoteNotification>) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        tracing::debug!(user_id = %self.user_id, count = remote.len(), "Remote snapshot received");
        if let Ok(mut state) = self.state() {
            state.remote = remote;
            state.hidden.clear();
        }
        self.recompute();
    }

    fn recompute(&self) {
        // Load dismissals before taking the state lock
        let dismissed = match self.dismissals.dismissed(&self.user_id) {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "Could not load dismissals");
                HashSet::new()
            }
        };
        let now = self.clock.now();

        let Ok(mut state) = self.state() else {
            tracing::error!(user_id = %self.user_id, "Notification state poisoned");
            return;
        };

        let mut merged: Vec<Notification> = generate(&state.sources, now)
            .into_iter()
            .filter(|n| !dismissed.contains(&n.id) && !state.dismissed.contains(&n.id))
            .collect();
        merged.extend(
            state
                .remote
                .iter()
                .filter(|r| !state.hidden.contains(&r.id))
                .cloned()
                .map(Notification::from),
        );
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        state.current = merged;
        self.publish(state.current.clone());
    }

    fn publish(&self, notifications: Vec<Notification>) {
        self.tx.send_replace(NotificationSummary::from_list(notifications));
    }
}
