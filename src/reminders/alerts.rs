//! Platform alerts (transient pop-up notifications).
//!
//! `AlertPlatform` is the OS/browser surface. `AlertService` owns the
//! permission flow and auto-closing, and is constructed once by the
//! composition root and shared by every reminder scheduler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::enums::AlertPermission;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAlert {
    pub title: String,
    pub body: String,
    /// Alerts with the same tag replace each other on the platform.
    pub tag: String,
    pub require_interaction: bool,
}

pub trait AlertPlatform: Send + Sync {
    fn permission(&self) -> AlertPermission;
    fn request_permission(&self) -> AlertPermission;
    /// Display an alert. Returns false when the platform refused it.
    fn show(&self, alert: &PlatformAlert) -> bool;
    fn close(&self, tag: &str);
}

pub struct AlertService {
    platform: Arc<dyn AlertPlatform>,
    auto_dismiss: Duration,
}

impl AlertService {
    pub fn new(platform: Arc<dyn AlertPlatform>, auto_dismiss: Duration) -> Self {
        Self {
            platform,
            auto_dismiss,
        }
    }

    pub fn permission(&self) -> AlertPermission {
        self.platform.permission()
    }

    pub fn request_permission(&self) -> AlertPermission {
        let permission = self.platform.request_permission();
        tracing::info!(permission = permission.as_str(), "Alert permission requested");
        permission
    }

    /// Show `alert` if permitted, asking for permission first when undecided.
    ///
    /// Alerts that do not require interaction are closed after the
    /// auto-dismiss delay.
    pub fn show(&self, alert: PlatformAlert) -> bool {
        let permitted = match self.platform.permission() {
            AlertPermission::Granted => true,
            AlertPermission::Denied => false,
            AlertPermission::Default => self.request_permission() == AlertPermission::Granted,
        };
        if !permitted {
            tracing::debug!(tag = %alert.tag, "Alert suppressed, permission not granted");
            return false;
        }

        if !self.platform.show(&alert) {
            tracing::warn!(tag = %alert.tag, "Platform refused to show alert");
            return false;
        }

        if !alert.require_interaction {
            self.schedule_close(alert.tag);
        }
        true
    }

    fn schedule_close(&self, tag: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(tag = %tag, "No runtime, alert left for the platform to close");
            return;
        };
        let platform = self.platform.clone();
        let delay = self.auto_dismiss;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            platform.close(&tag);
        });
    }
}

/// Headless platform: alerts become structured log events.
///
/// Permission starts undecided and is granted on request.
pub struct TracingAlertPlatform {
    permission: Mutex<AlertPermission>,
}

impl TracingAlertPlatform {
    pub fn new() -> Self {
        Self::with_permission(AlertPermission::Default)
    }

    pub fn with_permission(permission: AlertPermission) -> Self {
        Self {
            permission: Mutex::new(permission),
        }
    }
}

impl Default for TracingAlertPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertPlatform for TracingAlertPlatform {
    fn permission(&self) -> AlertPermission {
        self.permission
            .lock()
            .map(|p| *p)
            .unwrap_or(AlertPermission::Denied)
    }

    fn request_permission(&self) -> AlertPermission {
        let Ok(mut permission) = self.permission.lock() else {
            return AlertPermission::Denied;
        };
        if *permission == AlertPermission::Default {
            *permission = AlertPermission::Granted;
        }
        *permission
    }

    fn show(&self, alert: &PlatformAlert) -> bool {
        tracing::info!(
            tag = %alert.tag,
            require_interaction = alert.require_interaction,
            title = %alert.title,
            body = %alert.body,
            "Alert"
        );
        true
    }

    fn close(&self, tag: &str) {
        tracing::debug!(tag, "Alert closed");
    }
}
