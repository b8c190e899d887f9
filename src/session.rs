//! Per-patient notification session.
//!
//! Wires one patient's notification center and reminder task to the shared
//! services (clock, dismissal store, remote feed, alert service). Created
//! when a patient signs in and ended on sign-out; `end` is idempotent and
//! also runs on drop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::db::DatabaseError;
use crate::models::{PatientSources, User};
use crate::notifications::{DismissalStore, NotificationCenter, NotifyError, RemoteFeed};
use crate::reminders::{start_reminders, AlertService, ReminderHandle, ReminderSettings};

/// Services shared by every patient session.
#[derive(Clone)]
pub struct SessionServices {
    pub clock: Arc<dyn Clock>,
    pub dismissals: Arc<dyn DismissalStore>,
    pub feed: Arc<dyn RemoteFeed>,
    pub alerts: Arc<AlertService>,
    pub reminders: ReminderSettings,
}

pub struct PatientSession {
    user_id: String,
    center: NotificationCenter,
    reminders: ReminderHandle,
    refresher: JoinHandle<()>,
    /// Serializes source edits so the center and the reminder heap see them in one order.
    edits: Mutex<()>,
    ended: AtomicBool,
}

impl PatientSession {
    /// Start a session for a signed-in user. Doctors have no notification feed.
    pub fn start(user: &User, services: &SessionServices) -> Result<Self, NotifyError> {
        match user {
            User::Patient(patient) => Ok(Self::start_for_patient(
                &patient.id,
                patient.sources.clone(),
                services,
            )),
            User::Doctor(_) => Err(NotifyError::NotAPatient(user.role())),
        }
    }

    /// Must be called inside a tokio runtime.
    pub fn start_for_patient(
        user_id: &str,
        sources: PatientSources,
        services: &SessionServices,
    ) -> Self {
        let reminders = start_reminders(
            user_id,
            sources.appointments.clone(),
            services.reminders.clone(),
            services.clock.clone(),
            services.alerts.clone(),
        );

        let center = NotificationCenter::new(
            user_id,
            sources,
            services.clock.clone(),
            services.dismissals.clone(),
            services.feed.clone(),
        );
        center.start();

        // Time windows move even when nothing else changes
        let refresher = {
            let center = center.clone();
            let period = services.reminders.tick_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if center.is_stopped() {
                        break;
                    }
                    center.refresh();
                }
            })
        };

        tracing::info!(user_id, "Patient session started");
        Self {
            user_id: user_id.to_string(),
            center,
            reminders,
            refresher,
            edits: Mutex::new(()),
            ended: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn center(&self) -> &NotificationCenter {
        &self.center
    }

    /// Replace the patient's records: regenerates notifications and reschedules reminders.
    pub fn update_sources(&self, sources: PatientSources) -> Result<(), NotifyError> {
        let _edit = self.lock_edits()?;
        self.reminders.update(sources.appointments.clone());
        self.center.set_sources(sources);
        Ok(())
    }

    /// Edit the patient's records in place, e.g. to append a new record.
    pub fn modify_sources(
        &self,
        edit: impl FnOnce(&mut PatientSources),
    ) -> Result<PatientSources, NotifyError> {
        let _edit = self.lock_edits()?;
        let edited = self.center.modify_sources(edit)?;
        self.reminders.update(edited.appointments.clone());
        Ok(edited)
    }

    fn lock_edits(&self) -> Result<MutexGuard<'_, ()>, NotifyError> {
        self.edits
            .lock()
            .map_err(|_| NotifyError::Dismissal(DatabaseError::LockPoisoned))
    }

    /// Stop reminders and release the feed subscription. Safe to call more than once.
    pub fn end(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.reminders.stop();
        self.refresher.abort();
        self.center.stop();
        tracing::info!(user_id = %self.user_id, "Patient session ended");
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

impl Drop for PatientSession {
    fn drop(&mut self) {
        self.end();
    }
}
