use crate::client::PostgresClient;
use async_trait::async_trait;
use chrono::Utc;
use fuelguard_domain::{
    Device, DeviceConfiguration, DeviceHealthUpdate, DeviceRepository, DomainError, DomainResult,
    HealthStatus,
};
use tokio_postgres::Row;
use tracing::instrument;

const DEVICE_COLUMNS: &str = "device_id, serial_number, firmware_version, vehicle_id, \
     organization_id, health_status, last_seen, battery_level, signal_strength, \
     reading_interval_secs, alert_threshold_percent, gsm_apn, created_at, updated_at";

/// PostgreSQL implementation of DeviceRepository.
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_device(row: &Row) -> DomainResult<Device> {
    let health: String = row.get(5);
    let health_status = HealthStatus::parse(&health).ok_or_else(|| {
        DomainError::RepositoryError(anyhow::anyhow!("unknown health status: {}", health))
    })?;

    Ok(Device {
        device_id: row.get(0),
        serial_number: row.get(1),
        firmware_version: row.get(2),
        vehicle_id: row.get(3),
        organization_id: row.get(4),
        health_status,
        last_seen: row.get(6),
        battery_level: row.get(7),
        signal_strength: row.get(8),
        configuration: DeviceConfiguration {
            reading_interval_secs: row.get(9),
            alert_threshold_percent: row.get(10),
            gsm_apn: row.get(11),
        },
        created_at: row.get(12),
        updated_at: row.get(13),
    })
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self, device), fields(device_id = %device.device_id, organization_id = %device.organization_id))]
    async fn create_device(&self, device: Device) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let result = conn
            .execute(
                "INSERT INTO devices (device_id, serial_number, firmware_version, vehicle_id, \
                 organization_id, health_status, last_seen, battery_level, signal_strength, \
                 reading_interval_secs, alert_threshold_percent, gsm_apn, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
                &[
                    &device.device_id,
                    &device.serial_number,
                    &device.firmware_version,
                    &device.vehicle_id,
                    &device.organization_id,
                    &device.health_status.as_str(),
                    &device.last_seen,
                    &device.battery_level,
                    &device.signal_strength,
                    &device.configuration.reading_interval_secs,
                    &device.configuration.alert_threshold_percent,
                    &device.configuration.gsm_apn,
                    &device.created_at,
                    &device.updated_at,
                ],
            )
            .await;

        if let Err(e) = result {
            if let Some(db_err) = e.as_db_error() {
                // 23505 unique_violation
                if db_err.code().code() == "23505" {
                    return Err(DomainError::InvalidInput(format!(
                        "device already exists: {}",
                        device.device_id
                    )));
                }
            }
            return Err(DomainError::RepositoryError(e.into()));
        }

        Ok(())
    }

    async fn get_device(&self, device_id: &str) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE device_id = $1"),
                &[&device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.as_ref().map(row_to_device).transpose()
    }

    async fn list_devices(&self, organization_id: &str) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices \
                     WHERE organization_id = $1 ORDER BY last_seen DESC"
                ),
                &[&organization_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        rows.iter().map(row_to_device).collect()
    }

    async fn update_health(&self, update: DeviceHealthUpdate) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "UPDATE devices SET health_status = 'online', last_seen = $2, battery_level = $3, \
             signal_strength = $4, updated_at = $5 WHERE device_id = $1",
            &[
                &update.device_id,
                &update.last_seen,
                &update.battery_level,
                &update.signal_strength,
                &Utc::now(),
            ],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(())
    }

    async fn set_health_status(
        &self,
        device_id: &str,
        status: HealthStatus,
        last_seen: Option<i64>,
    ) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "UPDATE devices SET health_status = $2, \
             last_seen = COALESCE($3, last_seen), updated_at = $4 WHERE device_id = $1",
            &[&device_id, &status.as_str(), &last_seen, &Utc::now()],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(())
    }
}
