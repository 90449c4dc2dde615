use crate::reading::{Location, NewFuelReading, SensorReadings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed validation failure for an inbound device message. Rejection is
/// atomic: a single out-of-range field fails the whole message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("deviceId must be a non-empty string")]
    EmptyDeviceId,

    #[error("timestamp must be positive, got {0}")]
    NonPositiveTimestamp(i64),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Wire shape published on `fuelguard/devices/{device_id}/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicePayload {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub timestamp: i64,
    pub data: SensorData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    pub fuel: FuelBlock,
    pub gps: Option<GpsBlock>,
    pub tamper: bool,
    pub battery: f64,
    pub signal: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelBlock {
    pub ultrasonic: f64,
    #[serde(rename = "float")]
    pub float_value: f64,
    pub liters: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsBlock {
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub satellites: i32,
    pub fix: bool,
}

impl DevicePayload {
    /// Parse and validate raw message bytes. Pure: same input always yields
    /// the same accept/reject outcome.
    pub fn parse(raw: &[u8]) -> Result<Self, PayloadError> {
        let payload: DevicePayload =
            serde_json::from_slice(raw).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if self.device_id.is_empty() {
            return Err(PayloadError::EmptyDeviceId);
        }
        if self.timestamp <= 0 {
            return Err(PayloadError::NonPositiveTimestamp(self.timestamp));
        }

        let fuel = &self.data.fuel;
        check_min("fuel.ultrasonic", fuel.ultrasonic, 0.0)?;
        check_min("fuel.float", fuel.float_value, 0.0)?;
        check_min("fuel.liters", fuel.liters, 0.0)?;
        check_range("fuel.percentage", fuel.percentage, 0.0, 100.0)?;

        if let Some(gps) = &self.data.gps {
            check_range("gps.lat", gps.lat, -90.0, 90.0)?;
            check_range("gps.lon", gps.lon, -180.0, 180.0)?;
            check_min("gps.speed", gps.speed, 0.0)?;
            if gps.satellites < 0 {
                return Err(PayloadError::OutOfRange {
                    field: "gps.satellites",
                    value: gps.satellites as f64,
                });
            }
        }

        check_range("battery", self.data.battery, 0.0, 5.0)?;
        if !(0..=31).contains(&self.data.signal) {
            return Err(PayloadError::OutOfRange {
                field: "signal",
                value: self.data.signal as f64,
            });
        }

        Ok(())
    }

    /// Normalize a validated payload into a persistable reading. Sub-sensor
    /// validity flags are all true: a message that got this far passed the
    /// whole schema.
    pub fn into_reading(self, vehicle_id: String, organization_id: String) -> NewFuelReading {
        let gps = self.data.gps;
        NewFuelReading {
            device_id: self.device_id,
            vehicle_id,
            organization_id,
            timestamp: self.timestamp,
            fuel_liters: self.data.fuel.liters,
            fuel_percentage: self.data.fuel.percentage,
            location: gps.as_ref().map(|g| Location {
                lat: g.lat,
                lon: g.lon,
                speed: g.speed,
                satellites: g.satellites,
            }),
            sensors: SensorReadings {
                ultrasonic_distance: self.data.fuel.ultrasonic,
                ultrasonic_valid: true,
                float_value: self.data.fuel.float_value,
                float_valid: true,
                gps_fix: gps.as_ref().map(|g| g.fix).unwrap_or(false),
                gps_satellites: gps.as_ref().map(|g| g.satellites).unwrap_or(0),
                gps_speed: gps.as_ref().map(|g| g.speed).unwrap_or(0.0),
                tamper: self.data.tamper,
                battery: self.data.battery,
                signal_strength: self.data.signal,
            },
        }
    }
}

fn check_min(field: &'static str, value: f64, min: f64) -> Result<(), PayloadError> {
    if value < min || !value.is_finite() {
        return Err(PayloadError::OutOfRange { field, value });
    }
    Ok(())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), PayloadError> {
    if value < min || value > max || !value.is_finite() {
        return Err(PayloadError::OutOfRange { field, value });
    }
    Ok(())
}
