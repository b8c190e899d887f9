pub mod appointment;
pub mod enums;
pub mod medical_record;
pub mod notification;
pub mod symptom;
pub mod user;

pub use appointment::Appointment;
pub use medical_record::MedicalRecord;
pub use notification::{NewRemoteNotification, Notification, NotificationSummary, RemoteNotification};
pub use symptom::Symptom;
pub use user::{Doctor, PatientSources, PatientUser, User};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Parse the date formats the record screens emit into a local naive instant.
///
/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DDTHH:MM:SS[.fff]`, a space
/// separated variant, and RFC 3339 (converted to local time).
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}
