use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Online,
    Offline,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Online => "online",
            VehicleStatus::Offline => "offline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "online" => Some(VehicleStatus::Online),
            "offline" => Some(VehicleStatus::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub license_plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub tank_capacity_liters: f64,
    pub device_id: Option<String>,
    pub status: VehicleStatus,
    pub organization_id: String,
}
