use serde::{Deserialize, Serialize};

/// GPS position attached to a reading when the device had a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub speed: f64,
    pub satellites: i32,
}

/// Raw sensor block persisted alongside the normalized fuel level.
/// Validity flags are set by payload validation, which is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub ultrasonic_distance: f64,
    pub ultrasonic_valid: bool,
    pub float_value: f64,
    pub float_valid: bool,
    pub gps_fix: bool,
    pub gps_satellites: i32,
    pub gps_speed: f64,
    pub tamper: bool,
    pub battery: f64,
    pub signal_strength: i32,
}

/// Input for appending a reading (id assigned by the store).
#[derive(Debug, Clone, PartialEq)]
pub struct NewFuelReading {
    pub device_id: String,
    pub vehicle_id: String,
    pub organization_id: String,
    /// Epoch millis as reported by the device; monotonicity is not guaranteed.
    pub timestamp: i64,
    pub fuel_liters: f64,
    pub fuel_percentage: f64,
    pub location: Option<Location>,
    pub sensors: SensorReadings,
}

/// Persisted, immutable fuel reading. Never mutated; deleted only by the
/// retention sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelReading {
    pub reading_id: String,
    pub device_id: String,
    pub vehicle_id: String,
    pub organization_id: String,
    pub timestamp: i64,
    pub fuel_liters: f64,
    pub fuel_percentage: f64,
    pub location: Option<Location>,
    pub sensors: SensorReadings,
}

impl FuelReading {
    pub fn from_new(reading_id: String, new: NewFuelReading) -> Self {
        Self {
            reading_id,
            device_id: new.device_id,
            vehicle_id: new.vehicle_id,
            organization_id: new.organization_id,
            timestamp: new.timestamp,
            fuel_liters: new.fuel_liters,
            fuel_percentage: new.fuel_percentage,
            location: new.location,
            sensors: new.sensors,
        }
    }
}
