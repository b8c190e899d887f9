use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::reminders::ReminderSettings;

/// Application-level constants
pub const APP_NAME: &str = "MedAlert";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const ENV_PREFIX: &str = "MEDALERT_";

/// Get the application data directory
/// ~/MedAlert/ on all platforms, or the working directory without a home
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Local database holding dismissals and the notification feed
pub fn database_path() -> PathBuf {
    app_data_dir().join("medalert.db")
}

/// Log filter used when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "medalert=info,medalert_lib=info"
}

/// Runtime settings for the notification and reminder services.
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
    /// Longest sleep of the reminder task between deadline checks
    pub tick_interval: Duration,
    pub lead_minutes: Vec<i64>,
    /// Delay before non-interactive alerts are closed
    pub auto_dismiss: Duration,
    /// Dismissed ids kept per user (0 = unbounded)
    pub dismissal_cap: usize,
    pub bind_addr: IpAddr,
    /// 0 picks an ephemeral port
    pub port: u16,
    pub database_path: PathBuf,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            lead_minutes: vec![15, 5, 0],
            auto_dismiss: Duration::from_secs(5),
            dismissal_cap: 1000,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            database_path: database_path(),
        }
    }
}

impl NotifyConfig {
    /// Defaults overridden by `MEDALERT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Invalid values are logged and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(secs) = parse_var::<u64>("TICK_SECS", get("TICK_SECS")) {
            if secs == 0 {
                tracing::warn!("MEDALERT_TICK_SECS must be positive, keeping default");
            } else {
                config.tick_interval = Duration::from_secs(secs);
            }
        }
        if let Some(raw) = get("LEAD_MINUTES") {
            match parse_leads(&raw) {
                Some(leads) => config.lead_minutes = leads,
                None => tracing::warn!(value = %raw, "Invalid MEDALERT_LEAD_MINUTES, keeping default"),
            }
        }
        if let Some(secs) = parse_var::<u64>("AUTO_DISMISS_SECS", get("AUTO_DISMISS_SECS")) {
            config.auto_dismiss = Duration::from_secs(secs);
        }
        if let Some(cap) = parse_var::<usize>("DISMISSAL_CAP", get("DISMISSAL_CAP")) {
            config.dismissal_cap = cap;
        }
        if let Some(addr) = parse_var::<IpAddr>("BIND", get("BIND")) {
            config.bind_addr = addr;
        }
        if let Some(port) = parse_var::<u16>("PORT", get("PORT")) {
            config.port = port;
        }
        if let Some(path) = get("DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        config
    }

    pub fn reminder_settings(&self) -> ReminderSettings {
        ReminderSettings {
            lead_minutes: self.lead_minutes.clone(),
            tick_interval: self.tick_interval,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = %format!("{ENV_PREFIX}{name}"), value = %raw, "Invalid value, keeping default");
            None
        }
    }
}

/// Comma-separated non-negative minutes, e.g. "15,5,0".
fn parse_leads(raw: &str) -> Option<Vec<i64>> {
    let mut leads = Vec::new();
    for part in raw.split(',') {
        let lead = part.trim().parse::<i64>().ok()?;
        if lead < 0 {
            return None;
        }
        if !leads.contains(&lead) {
            leads.push(lead);
        }
    }
    (!leads.is_empty()).then_some(leads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> NotifyConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NotifyConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("MedAlert"));
        assert!(database_path().starts_with(app_data_dir()));
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.lead_minutes, vec![15, 5, 0]);
        assert_eq!(config.auto_dismiss, Duration::from_secs(5));
        assert_eq!(config.dismissal_cap, 1000);
        assert_eq!(config.port, 0);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1");
    }

    #[test]
    fn env_overrides() {
        let config = config_from(&[
            ("MEDALERT_TICK_SECS", "30"),
            ("MEDALERT_LEAD_MINUTES", "30, 10, 0"),
            ("MEDALERT_PORT", "8088"),
            ("MEDALERT_DISMISSAL_CAP", "0"),
            ("MEDALERT_DB_PATH", "/tmp/medalert-test.db"),
        ]);
        assert_eq!(config.tick_interval, Duration::from_secs(30));
        assert_eq!(config.lead_minutes, vec![30, 10, 0]);
        assert_eq!(config.port, 8088);
        assert_eq!(config.dismissal_cap, 0);
        assert_eq!(config.database_path, PathBuf::from("/tmp/medalert-test.db"));
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = config_from(&[
            ("MEDALERT_TICK_SECS", "0"),
            ("MEDALERT_LEAD_MINUTES", "15,-5"),
            ("MEDALERT_PORT", "http"),
            ("MEDALERT_BIND", "localhost"),
        ]);
        assert_eq!(config, NotifyConfig::default());
    }

    #[test]
    fn reminder_settings_follow_config() {
        let config = config_from(&[("MEDALERT_LEAD_MINUTES", "10")]);
        let settings = config.reminder_settings();
        assert_eq!(settings.lead_minutes, vec![10]);
        assert_eq!(settings.tick_interval, config.tick_interval);
    }
}
