use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{RecordCategory, RecordType};
use super::parse_instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub upload_date: String,
    pub category: RecordCategory,
}

impl MedicalRecord {
    pub fn uploaded_at(&self) -> Option<NaiveDateTime> {
        parse_instant(&self.upload_date)
    }
}
