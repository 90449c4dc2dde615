use crate::error::{DomainError, DomainResult};
use crate::reading::FuelReading;
use crate::repository::{ReadingRepository, VehicleRepository};
use crate::vehicle::Vehicle;
use std::sync::Arc;

/// Fleet read path: vehicle lookup and its recent telemetry. Vehicle rows
/// are provisioned out of band; this service only reads them.
pub struct VehicleService {
    vehicles: Arc<dyn VehicleRepository>,
    readings: Arc<dyn ReadingRepository>,
}

impl VehicleService {
    pub fn new(vehicles: Arc<dyn VehicleRepository>, readings: Arc<dyn ReadingRepository>) -> Self {
        Self { vehicles, readings }
    }

    /// Organization-scoped vehicle lookup; a mismatched organization reads
    /// as not found so nothing leaks across tenants.
    pub async fn get_vehicle(
        &self,
        vehicle_id: &str,
        organization_id: &str,
    ) -> DomainResult<Vehicle> {
        self.vehicles
            .get_vehicle(vehicle_id)
            .await?
            .filter(|v| v.organization_id == organization_id)
            .ok_or_else(|| DomainError::VehicleNotFound(vehicle_id.to_string()))
    }

    /// Latest readings for a vehicle, newest first. The vehicle lookup runs
    /// first so an unknown or foreign vehicle fails before touching the
    /// reading store.
    pub async fn recent_readings(
        &self,
        vehicle_id: &str,
        organization_id: &str,
        limit: i64,
    ) -> DomainResult<Vec<FuelReading>> {
        self.get_vehicle(vehicle_id, organization_id).await?;
        self.readings
            .list_recent(vehicle_id, organization_id, limit)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SensorReadings;
    use crate::repository::{MockReadingRepository, MockVehicleRepository};
    use crate::vehicle::VehicleStatus;

    fn sample_vehicle(organization_id: &str) -> Vehicle {
        Vehicle {
            vehicle_id: "veh-1".to_string(),
            license_plate: "ABC-123".to_string(),
            make: "Isuzu".to_string(),
            model: "NPR".to_string(),
            year: 2021,
            tank_capacity_liters: 200.0,
            device_id: Some("dev_1".to_string()),
            status: VehicleStatus::Offline,
            organization_id: organization_id.to_string(),
        }
    }

    fn sample_reading(timestamp: i64) -> FuelReading {
        FuelReading {
            reading_id: format!("read-{}", timestamp),
            device_id: "dev_1".to_string(),
            vehicle_id: "veh-1".to_string(),
            organization_id: "org-a".to_string(),
            timestamp,
            fuel_liters: 150.0,
            fuel_percentage: 75.0,
            location: None,
            sensors: SensorReadings {
                ultrasonic_distance: 40.0,
                ultrasonic_valid: true,
                float_value: 500.0,
                float_valid: true,
                gps_fix: false,
                gps_satellites: 0,
                gps_speed: 0.0,
                tamper: false,
                battery: 3.9,
                signal_strength: 22,
            },
        }
    }

    #[tokio::test]
    async fn test_get_vehicle() {
        let mut vehicles = MockVehicleRepository::new();
        vehicles
            .expect_get_vehicle()
            .returning(|_| Ok(Some(sample_vehicle("org-a"))));

        let service = VehicleService::new(Arc::new(vehicles), Arc::new(MockReadingRepository::new()));
        let vehicle = service.get_vehicle("veh-1", "org-a").await.unwrap();
        assert_eq!(vehicle.license_plate, "ABC-123");
    }

    #[tokio::test]
    async fn test_get_vehicle_hides_other_organizations() {
        let mut vehicles = MockVehicleRepository::new();
        vehicles
            .expect_get_vehicle()
            .returning(|_| Ok(Some(sample_vehicle("org-b"))));

        let service = VehicleService::new(Arc::new(vehicles), Arc::new(MockReadingRepository::new()));
        assert!(matches!(
            service.get_vehicle("veh-1", "org-a").await.unwrap_err(),
            DomainError::VehicleNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_recent_readings_newest_first() {
        let mut vehicles = MockVehicleRepository::new();
        vehicles
            .expect_get_vehicle()
            .returning(|_| Ok(Some(sample_vehicle("org-a"))));
        let mut readings = MockReadingRepository::new();
        readings
            .expect_list_recent()
            .withf(|vehicle_id, organization_id, limit| {
                vehicle_id == "veh-1" && organization_id == "org-a" && *limit == 2
            })
            .returning(|_, _, _| Ok(vec![sample_reading(2_000), sample_reading(1_000)]));

        let service = VehicleService::new(Arc::new(vehicles), Arc::new(readings));
        let recent = service.recent_readings("veh-1", "org-a", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, 2_000);
    }

    #[tokio::test]
    async fn test_recent_readings_for_unknown_vehicle() {
        let mut vehicles = MockVehicleRepository::new();
        vehicles.expect_get_vehicle().returning(|_| Ok(None));
        let mut readings = MockReadingRepository::new();
        readings.expect_list_recent().times(0);

        let service = VehicleService::new(Arc::new(vehicles), Arc::new(readings));
        assert!(matches!(
            service.recent_readings("veh-x", "org-a", 10).await.unwrap_err(),
            DomainError::VehicleNotFound(_)
        ));
    }
}
