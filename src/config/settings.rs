//! Application settings and configuration types.
//!
//! Settings are persisted to `~/.config/cadence/settings.json` (or XDG
//! equivalent) and loaded at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Sending window, pacing, and warmup configuration.
    pub sending: SendingSettings,
    /// Scheduler and reconciler timer configuration.
    pub scheduler: SchedulerSettings,
    /// MX validation cache configuration.
    pub dns: DnsSettings,
    /// Mail provider connection settings.
    pub mail: MailSettings,
    /// Optional AI personalization service settings.
    pub personalization: Option<PersonalizationSettings>,
    /// Optional CRM bridge settings.
    pub crm: Option<CrmSettings>,
    /// Database location override.
    pub database: DatabaseSettings,
}

/// Sending window, pacing, and warmup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendingSettings {
    /// First hour (inclusive) of the allowed local sending window.
    pub window_start_hour: u32,
    /// Last hour (exclusive) of the allowed local sending window.
    pub window_end_hour: u32,
    /// UTC offset in hours of the sending-window timezone.
    pub utc_offset_hours: i32,
    /// Pause between consecutive sends within a step.
    pub inter_send_delay_ms: u64,
    /// Absolute per-day ceiling imposed by the mail provider.
    pub provider_daily_ceiling: u32,
    /// Daily-limit escalation schedule indexed by days since first send.
    pub warmup_schedule: Vec<u32>,
}

impl Default for SendingSettings {
    fn default() -> Self {
        Self {
            window_start_hour: 9,
            window_end_hour: 18,
            utc_offset_hours: -5,
            inter_send_delay_ms: 2_000,
            provider_daily_ceiling: 100,
            warmup_schedule: vec![5, 10, 20, 35, 50, 75, 100],
        }
    }
}

impl SendingSettings {
    /// Returns the inter-send delay as a [`Duration`].
    pub fn inter_send_delay(&self) -> Duration {
        Duration::from_millis(self.inter_send_delay_ms)
    }
}

/// Scheduler and reconciler timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Interval between scheduler ticks.
    pub tick_interval_secs: u64,
    /// Interval between reconciler passes.
    pub reconcile_interval_secs: u64,
    /// Maximum number of records polled per reconciler pass.
    pub reconcile_window: usize,
    /// Pause between per-record provider status polls.
    pub reconcile_poll_delay_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            reconcile_interval_secs: 300,
            reconcile_window: 100,
            reconcile_poll_delay_ms: 200,
        }
    }
}

impl SchedulerSettings {
    /// Returns the scheduler tick interval as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Returns the reconciler interval as a [`Duration`].
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Returns the per-record poll delay as a [`Duration`].
    pub fn reconcile_poll_delay(&self) -> Duration {
        Duration::from_millis(self.reconcile_poll_delay_ms)
    }
}

/// MX validation cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsSettings {
    /// Maximum number of cached per-domain results.
    pub cache_capacity: usize,
    /// How long a cached result stays valid.
    pub cache_ttl_secs: u64,
    /// DNS query timeout.
    pub timeout_secs: u64,
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            cache_capacity: 1_000,
            cache_ttl_secs: 3_600,
            timeout_secs: 5,
        }
    }
}

/// Mail provider connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    /// Base URL of the transactional mail API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sender address for all outgoing mail.
    pub from_address: String,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.mailprovider.example".to_string(),
            api_key_env: "CADENCE_MAIL_API_KEY".to_string(),
            from_address: String::new(),
            from_name: None,
            timeout_secs: 30,
        }
    }
}

/// AI personalization service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizationSettings {
    /// Base URL of the personalization service.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PersonalizationSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key_env: "CADENCE_AI_API_KEY".to_string(),
            timeout_secs: 20,
        }
    }
}

/// CRM bridge connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmSettings {
    /// Base URL of the CRM API.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key_env: "CADENCE_CRM_API_KEY".to_string(),
            timeout_secs: 20,
        }
    }
}

/// Database location override.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseSettings {
    /// Explicit path to the SQLite database. Defaults to the data dir.
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_warmup_escalation() {
        let settings = SendingSettings::default();
        assert_eq!(settings.warmup_schedule, vec![5, 10, 20, 35, 50, 75, 100]);
        assert_eq!(settings.provider_daily_ceiling, 100);
    }

    #[test]
    fn default_window_is_nine_to_six() {
        let settings = SendingSettings::default();
        assert_eq!(settings.window_start_hour, 9);
        assert_eq!(settings.window_end_hour, 18);
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.scheduler.tick_interval_secs,
            settings.scheduler.tick_interval_secs
        );
        assert!(parsed.personalization.is_none());
        assert!(parsed.crm.is_none());
    }

    #[test]
    fn durations() {
        let scheduler = SchedulerSettings::default();
        assert_eq!(scheduler.tick_interval(), Duration::from_secs(60));
        assert_eq!(scheduler.reconcile_poll_delay(), Duration::from_millis(200));
    }
}
