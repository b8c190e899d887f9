use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use super::parse_instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    pub id: String,
    pub name: String,
    /// 1 (very mild) to 5 (very severe)
    #[serde(deserialize_with = "severity_in_range")]
    pub severity: u8,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub notes: String,
}

fn severity_in_range<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let severity = u8::deserialize(deserializer)?;
    if (1..=5).contains(&severity) {
        Ok(severity)
    } else {
        Err(serde::de::Error::custom(format!(
            "severity must be between 1 and 5, got {severity}"
        )))
    }
}

impl Symptom {
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        parse_instant(&self.start_date)
    }

    /// A symptom stays active until an end date is recorded.
    pub fn is_active(&self) -> bool {
        self.end_date
            .as_deref()
            .map(|d| d.trim().is_empty())
            .unwrap_or(true)
    }

    pub fn is_severe(&self) -> bool {
        self.severity >= 4
    }

    /// Values built in code outside 1..=5 clamp to the nearest label.
    pub fn severity_label(&self) -> &'static str {
        match self.severity {
            ..=1 => "Very Mild",
            2 => "Mild",
            3 => "Moderate",
            4 => "Severe",
            _ => "Very Severe",
        }
    }
}
