//! Appointment reminders: a deadline heap driven by a background task,
//! delivered through the platform alert service.

pub mod alerts;
pub mod schedule;
pub mod scheduler;

pub use alerts::{AlertPlatform, AlertService, PlatformAlert, TracingAlertPlatform};
pub use schedule::{due_lead, Deadline, ReminderSchedule};
pub use scheduler::{start_reminders, ReminderHandle, ReminderSettings};
