use crate::reading::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    FuelTheft,
    Tampering,
    SensorError,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::FuelTheft => "fuel_theft",
            AlertType::Tampering => "tampering",
            AlertType::SensorError => "sensor_error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "fuel_theft" => Some(AlertType::FuelTheft),
            "tampering" => Some(AlertType::Tampering),
            "sensor_error" => Some(AlertType::SensorError),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false_positive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(AlertStatus::Active),
            "resolved" => Some(AlertStatus::Resolved),
            "false_positive" => Some(AlertStatus::FalsePositive),
            _ => None,
        }
    }
}

/// Terminal status an operator may resolve an alert to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertResolution {
    Resolved,
    FalsePositive,
}

impl From<AlertResolution> for AlertStatus {
    fn from(resolution: AlertResolution) -> Self {
        match resolution {
            AlertResolution::Resolved => AlertStatus::Resolved,
            AlertResolution::FalsePositive => AlertStatus::FalsePositive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity tiers for a theft alert, keyed on the percentage drop.
    /// Strict comparisons: a drop in (10, 15] stays `Low`.
    pub fn from_percent_drop(percent_drop: f64) -> Self {
        if percent_drop > 30.0 {
            Severity::Critical
        } else if percent_drop > 20.0 {
            Severity::High
        } else if percent_drop > 15.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// Alert position, copied from the triggering reading when it had a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLocation {
    pub lat: f64,
    pub lon: f64,
}

impl From<&Location> for AlertLocation {
    fn from(location: &Location) -> Self {
        Self {
            lat: location.lat,
            lon: location.lon,
        }
    }
}

/// Raised by the detection engine; only the resolve operation mutates it
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub alert_id: String,
    pub vehicle_id: String,
    pub device_id: String,
    pub alert_type: AlertType,
    pub fuel_loss_liters: f64,
    pub location: Option<AlertLocation>,
    pub status: AlertStatus,
    pub severity: Severity,
    pub detected_at: i64,
    pub resolved_at: Option<i64>,
    pub resolved_by: Option<String>,
    pub notes: Option<String>,
    pub organization_id: String,
}
