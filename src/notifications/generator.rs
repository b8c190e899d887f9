//! Synthetic notifications derived from a patient's records.
//!
//! `generate` is a pure projection of `(sources, now)`: it recomputes the
//! full list from scratch and never touches storage. Every item id is a
//! deterministic function of the source entity id plus a qualifier, so the
//! same inputs always yield the same ids and dismissals stay addressable.
//!
//! All thresholds use floor division of millisecond differences (toward
//! negative infinity), with the exact operators listed on each rule.

use chrono::{Duration, NaiveDateTime};

use crate::models::enums::{NotificationType, Priority};
use crate::models::{Appointment, MedicalRecord, Notification, PatientSources, Symptom};

const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

pub const NO_APPOINTMENTS_ID: &str = "no-appointments";

/// Whole-unit differences of a signed millisecond delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    ms: i64,
    days: i64,
    hours: i64,
    minutes: i64,
}

impl Span {
    fn between(later: NaiveDateTime, earlier: NaiveDateTime) -> Self {
        let ms = (later - earlier).num_milliseconds();
        Self {
            ms,
            days: ms.div_euclid(MS_PER_DAY),
            hours: ms.div_euclid(MS_PER_HOUR),
            minutes: ms.div_euclid(MS_PER_MINUTE),
        }
    }
}

/// Compute every generated notification for `sources` at `now`.
pub fn generate(sources: &PatientSources, now: NaiveDateTime) -> Vec<Notification> {
    let mut out = Vec::new();

    for appointment in &sources.appointments {
        out.extend(appointment_notifications(appointment, now));
    }
    for record in &sources.medical_records {
        out.extend(record_notification(record, now));
    }
    for symptom in &sources.symptoms {
        out.extend(symptom_notification(symptom, now));
    }

    if sources.appointments.is_empty() {
        out.push(generated(
            NO_APPOINTMENTS_ID.to_string(),
            "Schedule Regular Check-up",
            "It's important to schedule regular health check-ups. Consider booking an \
             appointment with your healthcare provider."
                .to_string(),
            NotificationType::Info,
            Priority::Low,
            now - Duration::days(1),
        ));
    }

    out
}

/// Upcoming windows are checked tomorrow, then soon, then imminent; the
/// first match wins. A past appointment within a week yields "completed".
fn appointment_notifications(appointment: &Appointment, now: NaiveDateTime) -> Vec<Notification> {
    let Some(at) = appointment.scheduled_at() else {
        tracing::warn!(
            appointment_id = %appointment.id,
            date = %appointment.date,
            time = %appointment.time,
            "Skipping appointment with unparseable date/time"
        );
        return Vec::new();
    };

    let span = Span::between(at, now);
    let mut out = Vec::new();

    if span.ms > 0 {
        if span.days == 1 {
            out.push(generated(
                format!("{}-tomorrow", appointment.id),
                "Appointment Tomorrow",
                format!(
                    "{} is scheduled for tomorrow at {}",
                    appointment.title, appointment.time
                ),
                NotificationType::Reminder,
                Priority::High,
                now - Duration::minutes(5),
            ));
        } else if span.hours > 0 && span.hours <= 2 {
            let plural = if span.hours > 1 { "s" } else { "" };
            out.push(generated(
                format!("{}-soon", appointment.id),
                "Appointment Soon",
                format!(
                    "{} is in {} hour{} at {}",
                    appointment.title, span.hours, plural, appointment.time
                ),
                NotificationType::Warning,
                Priority::High,
                now - Duration::minutes(2),
            ));
        } else if span.minutes > 0 && span.minutes <= 15 {
            out.push(generated(
                format!("{}-imminent", appointment.id),
                "Appointment Starting Soon",
                format!("{} starts in {} minutes", appointment.title, span.minutes),
                NotificationType::Warning,
                Priority::High,
                now - Duration::minutes(1),
            ));
        }
    }

    if span.ms < 0 && span.days.abs() <= 7 {
        out.push(generated(
            format!("{}-completed", appointment.id),
            "Appointment Completed",
            format!(
                "{} was scheduled for {} at {}",
                appointment.title,
                at.format("%-m/%-d/%Y"),
                appointment.time
            ),
            NotificationType::Success,
            Priority::Medium,
            at,
        ));
    }

    out
}

fn record_notification(record: &MedicalRecord, now: NaiveDateTime) -> Option<Notification> {
    let Some(uploaded) = record.uploaded_at() else {
        tracing::warn!(
            record_id = %record.id,
            upload_date = %record.upload_date,
            "Skipping medical record with unparseable upload date"
        );
        return None;
    };

    if Span::between(now, uploaded).days > 3 {
        return None;
    }

    Some(generated(
        format!("record-{}", record.id),
        "New Medical Record",
        format!("{} has been uploaded to your records", record.title),
        NotificationType::Success,
        Priority::Medium,
        uploaded,
    ))
}

fn symptom_notification(symptom: &Symptom, now: NaiveDateTime) -> Option<Notification> {
    if !symptom.is_active() {
        return None;
    }
    let Some(started) = symptom.started_at() else {
        tracing::warn!(
            symptom_id = %symptom.id,
            start_date = %symptom.start_date,
            "Skipping symptom with unparseable start date"
        );
        return None;
    };

    let days = Span::between(now, started).days;
    if !(3..=7).contains(&days) {
        return None;
    }

    let (kind, priority) = if symptom.is_severe() {
        (NotificationType::Warning, Priority::High)
    } else {
        (NotificationType::Info, Priority::Medium)
    };

    Some(generated(
        format!("symptom-{}", symptom.id),
        "Ongoing Symptom",
        format!(
            "You've been tracking \"{}\" for {} days. Consider consulting your doctor if \
             symptoms persist.",
            symptom.name, days
        ),
        kind,
        priority,
        now - Duration::days(days),
    ))
}

fn generated(
    id: String,
    title: &str,
    message: String,
    kind: NotificationType,
    priority: Priority,
    timestamp: NaiveDateTime,
) -> Notification {
    Notification {
        id,
        title: title.to_string(),
        message,
        kind,
        timestamp,
        priority,
        is_generated: true,
        action_url: None,
    }
}

/// Relative label for a notification timestamp, e.g. "3 hours ago".
pub fn format_time_ago(timestamp: NaiveDateTime, now: NaiveDateTime) -> String {
    let minutes = (now - timestamp).num_milliseconds().div_euclid(MS_PER_MINUTE);

    if minutes < 60 {
        format!("{minutes} minutes ago")
    } else if minutes < 1440 {
        let hours = minutes / 60;
        format!("{hours} hour{} ago", if hours > 1 { "s" } else { "" })
    } else {
        let days = minutes / 1440;
        format!("{days} day{} ago", if days > 1 { "s" } else { "" })
    }
}
