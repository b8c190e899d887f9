//! Background reminder task.
//!
//! Sleeps until the earliest pending deadline, an appointment update, the
//! periodic safety tick, or shutdown. Due deadlines fire one platform alert
//! each, tagged `appointment-{id}`. The at-time reminder requires
//! interaction; earlier ones auto-close.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use super::alerts::{AlertService, PlatformAlert};
use super::schedule::{due_lead, Deadline, ReminderSchedule};
use crate::clock::Clock;
use crate::models::Appointment;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub lead_minutes: Vec<i64>,
    /// Upper bound on any single sleep.
    pub tick_interval: Duration,
}

/// Handle to a running reminder task. Dropping it stops the task.
pub struct ReminderHandle {
    appointments: watch::Sender<Vec<Appointment>>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ReminderHandle {
    /// Replace the appointment set; the deadline heap is rebuilt.
    pub fn update(&self, appointments: Vec<Appointment>) {
        self.appointments.send_replace(appointments);
    }

    /// Request shutdown. Safe to call more than once.
    pub fn stop(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            self.wake.notify_one();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReminderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the reminder task on the current tokio runtime.
pub fn start_reminders(
    user_id: &str,
    appointments: Vec<Appointment>,
    settings: ReminderSettings,
    clock: Arc<dyn Clock>,
    alerts: Arc<AlertService>,
) -> ReminderHandle {
    let (tx, rx) = watch::channel(appointments);
    let shutdown = Arc::new(AtomicBool::new(false));
    let wake = Arc::new(Notify::new());

    let worker = ReminderWorker {
        user_id: user_id.to_string(),
        settings,
        clock,
        alerts,
        shutdown: shutdown.clone(),
        wake: wake.clone(),
    };
    let task = tokio::spawn(worker.run(rx));

    ReminderHandle {
        appointments: tx,
        shutdown,
        wake,
        task,
    }
}

struct ReminderWorker {
    user_id: String,
    settings: ReminderSettings,
    clock: Arc<dyn Clock>,
    alerts: Arc<AlertService>,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ReminderWorker {
    async fn run(self, mut appointments: watch::Receiver<Vec<Appointment>>) {
        let mut schedule = ReminderSchedule::new(self.settings.lead_minutes.clone());
        schedule.rebuild(&appointments.borrow_and_update(), self.clock.now());
        tracing::info!(
            user_id = %self.user_id,
            pending = schedule.len(),
            "Reminder scheduler started"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let now = self.clock.now();
            for deadline in schedule.pop_due(now) {
                self.fire(&deadline, now);
            }

            let wait = schedule
                .next_deadline()
                .map(|at| (at - now).to_std().unwrap_or(Duration::ZERO))
                .unwrap_or(self.settings.tick_interval)
                .min(self.settings.tick_interval);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = appointments.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = appointments.borrow_and_update().clone();
                    schedule.rebuild(&current, self.clock.now());
                }
                _ = self.wake.notified() => {}
            }
        }

        tracing::info!(user_id = %self.user_id, "Reminder scheduler stopped");
    }

    fn fire(&self, deadline: &Deadline, now: NaiveDateTime) {
        let instant = deadline.at + chrono::Duration::minutes(deadline.lead_minutes);
        // Whole minutes left, rounded up; a wake-up more than a minute late no longer matches
        let ms = (instant - now).num_milliseconds();
        let minutes_until = -(-ms).div_euclid(MS_PER_MINUTE);

        if due_lead(minutes_until, &self.settings.lead_minutes) != Some(deadline.lead_minutes) {
            tracing::warn!(
                user_id = %self.user_id,
                appointment_id = %deadline.appointment_id,
                lead_minutes = deadline.lead_minutes,
                "Reminder deadline missed, skipping"
            );
            return;
        }

        let shown = self.alerts.show(reminder_alert(deadline));
        tracing::info!(
            user_id = %self.user_id,
            appointment_id = %deadline.appointment_id,
            lead_minutes = deadline.lead_minutes,
            shown,
            "Appointment reminder fired"
        );
    }
}

pub fn reminder_alert(deadline: &Deadline) -> PlatformAlert {
    let (title, body) = if deadline.lead_minutes == 0 {
        (
            "Appointment Now".to_string(),
            format!("{} is starting now ({})", deadline.title, deadline.time),
        )
    } else {
        (
            format!("Appointment in {} minutes", deadline.lead_minutes),
            format!("{} at {}", deadline.title, deadline.time),
        )
    };

    PlatformAlert {
        title,
        body,
        tag: deadline.tag(),
        require_interaction: deadline.lead_minutes == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::PausedClock;
    use crate::models::enums::{AlertPermission, AppointmentKind};
    use crate::reminders::alerts::testing::RecordingPlatform;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn appt(id: &str, time: &str) -> Appointment {
        Appointment {
            id: id.into(),
            title: "Dentist".into(),
            date: "2025-01-15".into(),
            time: time.into(),
            kind: AppointmentKind::Appointment,
            notes: String::new(),
        }
    }

    fn settings() -> ReminderSettings {
        ReminderSettings {
            lead_minutes: vec![15, 5, 0],
            tick_interval: Duration::from_secs(60),
        }
    }

    fn setup(platform: RecordingPlatform) -> (Arc<RecordingPlatform>, Arc<AlertService>) {
        let platform = Arc::new(platform);
        let service = Arc::new(AlertService::new(platform.clone(), Duration::from_secs(5)));
        (platform, service)
    }

    async fn minutes(n: u64) {
        tokio::time::sleep(Duration::from_secs(n * 60)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fires_at_each_lead_time() {
        let (platform, alerts) = setup(RecordingPlatform::granted());
        let clock = Arc::new(PausedClock::starting_at(at(9, 40)));
        let handle = start_reminders("u1", vec![appt("a1", "10:00")], settings(), clock, alerts);

        minutes(6).await;
        let shown = platform.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Appointment in 15 minutes");
        assert_eq!(shown[0].tag, "appointment-a1");
        assert!(!shown[0].require_interaction);

        minutes(15).await;
        let shown = platform.shown();
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[1].title, "Appointment in 5 minutes");
        assert_eq!(shown[2].title, "Appointment Now");
        assert!(shown[2].require_interaction);

        // The two early alerts were auto-closed, the at-time one was not
        assert_eq!(platform.closed(), vec!["appointment-a1", "appointment-a1"]);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn update_rebuilds_deadlines() {
        let (platform, alerts) = setup(RecordingPlatform::granted());
        let clock = Arc::new(PausedClock::starting_at(at(9, 50)));
        let handle = start_reminders("u1", Vec::new(), settings(), clock, alerts);

        minutes(1).await;
        // 10:00 appointment added at 09:51: the 15-minute reminder already passed
        handle.update(vec![appt("a1", "10:00")]);
        minutes(10).await;

        let leads: Vec<bool> = platform.shown().iter().map(|a| a.require_interaction).collect();
        assert_eq!(leads, vec![false, true]);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_alerts() {
        let (platform, alerts) = setup(RecordingPlatform::granted());
        let clock = Arc::new(PausedClock::starting_at(at(9, 40)));
        let handle = start_reminders("u1", vec![appt("a1", "10:00")], settings(), clock, alerts);

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        minutes(30).await;
        assert!(platform.shown().is_empty());
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_task() {
        let (platform, alerts) = setup(RecordingPlatform::granted());
        let clock = Arc::new(PausedClock::starting_at(at(9, 40)));
        drop(start_reminders("u1", vec![appt("a1", "10:00")], settings(), clock, alerts));

        minutes(30).await;
        assert!(platform.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn denied_permission_shows_nothing() {
        let (platform, alerts) = setup(RecordingPlatform {
            permission: Mutex::new(AlertPermission::Denied),
            ..RecordingPlatform::default()
        });
        let clock = Arc::new(PausedClock::starting_at(at(9, 40)));
        let handle = start_reminders("u1", vec![appt("a1", "10:00")], settings(), clock, alerts);

        minutes(30).await;
        assert!(platform.shown().is_empty());
        handle.stop();
    }

    #[test]
    fn alert_text_per_lead() {
        let deadline = Deadline {
            at: at(9, 55),
            appointment_id: "a1".into(),
            lead_minutes: 5,
            title: "Dentist".into(),
            time: "10:00".into(),
        };
        let alert = reminder_alert(&deadline);
        assert_eq!(alert.body, "Dentist at 10:00");
        assert!(!alert.require_interaction);

        let now_alert = reminder_alert(&Deadline { lead_minutes: 0, at: at(10, 0), ..deadline });
        assert_eq!(now_alert.body, "Dentist is starting now (10:00)");
        assert!(now_alert.require_interaction);
    }
}
