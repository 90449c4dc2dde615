use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A device with no accepted reading in this window is considered offline.
pub const DEVICE_OFFLINE_AFTER_MILLIS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Online,
    Offline,
    Error,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Online => "online",
            HealthStatus::Offline => "offline",
            HealthStatus::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(HealthStatus::Online),
            "offline" => Some(HealthStatus::Offline),
            "error" => Some(HealthStatus::Error),
            _ => None,
        }
    }
}

/// Device-side settings pushed down over the command channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfiguration {
    pub reading_interval_secs: i32,
    pub alert_threshold_percent: f64,
    pub gsm_apn: String,
}

impl Default for DeviceConfiguration {
    fn default() -> Self {
        Self {
            reading_interval_secs: 30,
            alert_threshold_percent: 10.0,
            gsm_apn: "internet".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub device_id: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub vehicle_id: Option<String>,
    pub organization_id: String,
    pub health_status: HealthStatus,
    /// Epoch millis of the last accepted reading or status message.
    pub last_seen: i64,
    pub battery_level: f64,
    pub signal_strength: i32,
    pub configuration: DeviceConfiguration,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Liveness is evaluated lazily on read, not by a background sweep.
    pub fn is_online(&self, now_millis: i64) -> bool {
        now_millis - self.last_seen < DEVICE_OFFLINE_AFTER_MILLIS
    }
}

/// Stored credential row. Only the token hash is ever persisted; the
/// plaintext token exists transiently in the issue/rotate response.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCredential {
    pub device_id: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}
