//! Record creation hook.
//!
//! When a patient adds an appointment, medical record or symptom, the
//! record joins the session's sources and a matching notification is
//! inserted into the remote feed. The record is kept even when the feed
//! insert fails; the response then carries no notification id.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::endpoints::notifications::create_remote;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Appointment, MedicalRecord, Symptom};
use crate::notifications::feed::{appointment_created, medical_record_created, symptom_created};

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum CreatedRecord {
    Appointment(Appointment),
    MedicalRecord(MedicalRecord),
    Symptom(Symptom),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCreatedResponse {
    pub notification_id: Option<String>,
}

/// `POST /api/patients/:user_id/records`
pub async fn created(
    State(ctx): State<ApiContext>,
    Path(user_id): Path<String>,
    Json(record): Json<CreatedRecord>,
) -> Result<(StatusCode, Json<RecordCreatedResponse>), ApiError> {
    let session = ctx.session(&user_id)?;
    let now = ctx.services.clock.now();

    let payload = match record {
        CreatedRecord::Appointment(appointment) => {
            let payload = appointment_created(&user_id, &appointment, now);
            session.modify_sources(|s| s.appointments.push(appointment))?;
            payload
        }
        CreatedRecord::MedicalRecord(record) => {
            let payload = medical_record_created(&user_id, &record);
            session.modify_sources(|s| s.medical_records.push(record))?;
            payload
        }
        CreatedRecord::Symptom(symptom) => {
            let payload = symptom_created(&user_id, &symptom);
            session.modify_sources(|s| s.symptoms.push(symptom))?;
            payload
        }
    };

    let notification_id = match create_remote(&ctx, payload).await {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Record notification not delivered to feed");
            None
        }
    };

    Ok((StatusCode::CREATED, Json(RecordCreatedResponse { notification_id })))
}
