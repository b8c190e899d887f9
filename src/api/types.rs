//! Shared types for the HTTP layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::models::{Notification, NotificationSummary, PatientSources};
use crate::notifications::format_time_ago;
use crate::session::{PatientSession, SessionServices};

type SessionMap = HashMap<String, Arc<PatientSession>>;

/// Shared context for all API routes: the services plus live patient sessions.
#[derive(Clone)]
pub struct ApiContext {
    pub services: SessionServices,
    sessions: Arc<Mutex<SessionMap>>,
}

impl ApiContext {
    pub fn new(services: SessionServices) -> Self {
        Self {
            services,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionMap>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::Internal("session map lock poisoned".into()))
    }

    /// The live session of `user_id`.
    pub fn session(&self, user_id: &str) -> Result<Arc<PatientSession>, ApiError> {
        self.lock_sessions()?
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::NoSession(user_id.to_string()))
    }

    /// Push `sources` into the patient's session, starting one if needed.
    pub fn upsert_session(
        &self,
        user_id: &str,
        sources: PatientSources,
    ) -> Result<Arc<PatientSession>, ApiError> {
        let mut sessions = self.lock_sessions()?;
        if let Some(session) = sessions.get(user_id) {
            session.update_sources(sources)?;
            return Ok(session.clone());
        }
        let session = Arc::new(PatientSession::start_for_patient(
            user_id,
            sources,
            &self.services,
        ));
        sessions.insert(user_id.to_string(), session.clone());
        Ok(session)
    }

    /// End and forget the patient's session. Returns false if none existed.
    pub fn end_session(&self, user_id: &str) -> Result<bool, ApiError> {
        let removed = self.lock_sessions()?.remove(user_id);
        Ok(match removed {
            Some(session) => {
                session.end();
                true
            }
            None => false,
        })
    }

    /// End every session (server shutdown).
    pub fn end_all_sessions(&self) {
        let drained: Vec<Arc<PatientSession>> = match self.sessions.lock() {
            Ok(mut sessions) => sessions.drain().map(|(_, s)| s).collect(),
            Err(_) => {
                tracing::error!("Session map poisoned during shutdown");
                return;
            }
        };
        for session in drained {
            session.end();
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// A notification as served over HTTP, with its relative time label.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub time_ago: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationView>,
    pub unread_count: usize,
    pub total_count: usize,
    pub loading: bool,
}

impl NotificationListResponse {
    /// `listed` may be a filtered subset; counts always describe the full summary.
    pub fn new(summary: &NotificationSummary, listed: Vec<Notification>, now: NaiveDateTime) -> Self {
        Self {
            notifications: listed
                .into_iter()
                .map(|n| NotificationView {
                    time_ago: format_time_ago(n.timestamp, now),
                    notification: n,
                })
                .collect(),
            unread_count: summary.unread_count,
            total_count: summary.total_count,
            loading: summary.loading,
        }
    }
}
