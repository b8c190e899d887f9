use serde::{Deserialize, Serialize};

use super::appointment::Appointment;
use super::medical_record::MedicalRecord;
use super::symptom::Symptom;

/// The event source a patient's generated notifications are derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSources {
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub medical_records: Vec<MedicalRecord>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub email: String,
    pub license_number: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(flatten)]
    pub sources: PatientSources,
}

/// Signed-in user, discriminated by `role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum User {
    Doctor(Doctor),
    Patient(PatientUser),
}

impl User {
    pub fn id(&self) -> &str {
        match self {
            User::Doctor(d) => &d.id,
            User::Patient(p) => &p.id,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            User::Doctor(_) => "doctor",
            User::Patient(_) => "patient",
        }
    }
}
