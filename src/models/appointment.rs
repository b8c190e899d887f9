use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub title: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM, 24h
    pub time: String,
    #[serde(rename = "type")]
    pub kind: AppointmentKind,
    #[serde(default)]
    pub notes: String,
}

impl Appointment {
    /// Local instant formed by `date` + `time`. `None` when either part is malformed.
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(self.time.trim(), "%H:%M:%S"))
            .ok()?;
        Some(date.and_time(time))
    }
}
