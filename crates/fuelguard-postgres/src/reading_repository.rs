use crate::client::PostgresClient;
use async_trait::async_trait;
use fuelguard_domain::{
    DomainError, DomainResult, FuelReading, Location, NewFuelReading, ReadingRepository,
    SensorReadings,
};
use tokio_postgres::Row;
use tracing::{debug, instrument};

const READING_COLUMNS: &str = "reading_id, device_id, vehicle_id, organization_id, timestamp, \
     fuel_liters, fuel_percentage, gps_lat, gps_lon, gps_speed, gps_satellites, \
     ultrasonic_distance, ultrasonic_valid, float_value, float_valid, sensor_gps_fix, \
     sensor_gps_satellites, sensor_gps_speed, tamper, battery, signal_strength";

/// PostgreSQL implementation of ReadingRepository.
#[derive(Clone)]
pub struct PostgresReadingRepository {
    client: PostgresClient,
}

impl PostgresReadingRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_reading(row: &Row) -> FuelReading {
    let gps_lat: Option<f64> = row.get(7);
    let location = gps_lat.map(|lat| Location {
        lat,
        lon: row.get(8),
        speed: row.get(9),
        satellites: row.get(10),
    });

    FuelReading {
        reading_id: row.get(0),
        device_id: row.get(1),
        vehicle_id: row.get(2),
        organization_id: row.get(3),
        timestamp: row.get(4),
        fuel_liters: row.get(5),
        fuel_percentage: row.get(6),
        location,
        sensors: SensorReadings {
            ultrasonic_distance: row.get(11),
            ultrasonic_valid: row.get(12),
            float_value: row.get(13),
            float_valid: row.get(14),
            gps_fix: row.get(15),
            gps_satellites: row.get(16),
            gps_speed: row.get(17),
            tamper: row.get(18),
            battery: row.get(19),
            signal_strength: row.get(20),
        },
    }
}

#[async_trait]
impl ReadingRepository for PostgresReadingRepository {
    #[instrument(skip(self, reading), fields(device_id = %reading.device_id, vehicle_id = %reading.vehicle_id))]
    async fn append(&self, reading: NewFuelReading) -> DomainResult<String> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let reading_id = xid::new().to_string();
        let (gps_lat, gps_lon, gps_speed, gps_satellites) = match &reading.location {
            Some(l) => (Some(l.lat), Some(l.lon), Some(l.speed), Some(l.satellites)),
            None => (None, None, None, None),
        };

        let inserted = conn
            .execute(
                "INSERT INTO fuel_readings (reading_id, device_id, vehicle_id, organization_id, \
                 timestamp, fuel_liters, fuel_percentage, gps_lat, gps_lon, gps_speed, \
                 gps_satellites, ultrasonic_distance, ultrasonic_valid, float_value, float_valid, \
                 sensor_gps_fix, sensor_gps_satellites, sensor_gps_speed, tamper, battery, \
                 signal_strength) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 $17, $18, $19, $20, $21) \
                 ON CONFLICT (device_id, timestamp) DO NOTHING",
                &[
                    &reading_id,
                    &reading.device_id,
                    &reading.vehicle_id,
                    &reading.organization_id,
                    &reading.timestamp,
                    &reading.fuel_liters,
                    &reading.fuel_percentage,
                    &gps_lat,
                    &gps_lon,
                    &gps_speed,
                    &gps_satellites,
                    &reading.sensors.ultrasonic_distance,
                    &reading.sensors.ultrasonic_valid,
                    &reading.sensors.float_value,
                    &reading.sensors.float_valid,
                    &reading.sensors.gps_fix,
                    &reading.sensors.gps_satellites,
                    &reading.sensors.gps_speed,
                    &reading.sensors.tamper,
                    &reading.sensors.battery,
                    &reading.sensors.signal_strength,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if inserted == 1 {
            return Ok(reading_id);
        }

        // Duplicate delivery: hand back the id of the row that won.
        let row = conn
            .query_one(
                "SELECT reading_id FROM fuel_readings WHERE device_id = $1 AND timestamp = $2",
                &[&reading.device_id, &reading.timestamp],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let existing: String = row.get(0);
        debug!(reading_id = %existing, "duplicate reading delivery, keeping existing row");
        Ok(existing)
    }

    async fn previous_before(
        &self,
        vehicle_id: &str,
        timestamp: i64,
    ) -> DomainResult<Option<FuelReading>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!(
                    "SELECT {READING_COLUMNS} FROM fuel_readings \
                     WHERE vehicle_id = $1 AND timestamp < $2 \
                     ORDER BY timestamp DESC LIMIT 1"
                ),
                &[&vehicle_id, &timestamp],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.as_ref().map(row_to_reading))
    }

    async fn list_recent(
        &self,
        vehicle_id: &str,
        organization_id: &str,
        limit: i64,
    ) -> DomainResult<Vec<FuelReading>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {READING_COLUMNS} FROM fuel_readings \
                     WHERE vehicle_id = $1 AND organization_id = $2 \
                     ORDER BY timestamp DESC LIMIT $3"
                ),
                &[&vehicle_id, &organization_id, &limit],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows.iter().map(row_to_reading).collect())
    }

    #[instrument(skip(self))]
    async fn purge_older_than(&self, cutoff_millis: i64, batch_limit: i64) -> DomainResult<u64> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute(
                "DELETE FROM fuel_readings WHERE reading_id IN ( \
                     SELECT reading_id FROM fuel_readings WHERE timestamp < $1 LIMIT $2)",
                &[&cutoff_millis, &batch_limit],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(deleted, cutoff_millis, "purged readings batch");
        Ok(deleted)
    }
}
