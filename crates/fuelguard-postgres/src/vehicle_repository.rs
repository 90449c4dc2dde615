use crate::client::PostgresClient;
use async_trait::async_trait;
use fuelguard_domain::{
    DomainError, DomainResult, Vehicle, VehicleRepository, VehicleStatus,
};
use tokio_postgres::Row;

/// PostgreSQL implementation of VehicleRepository.
#[derive(Clone)]
pub struct PostgresVehicleRepository {
    client: PostgresClient,
}

impl PostgresVehicleRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_vehicle(row: &Row) -> DomainResult<Vehicle> {
    let status: String = row.get(7);
    let status = VehicleStatus::parse(&status).ok_or_else(|| {
        DomainError::RepositoryError(anyhow::anyhow!("unknown vehicle status: {}", status))
    })?;

    Ok(Vehicle {
        vehicle_id: row.get(0),
        license_plate: row.get(1),
        make: row.get(2),
        model: row.get(3),
        year: row.get(4),
        tank_capacity_liters: row.get(5),
        device_id: row.get(6),
        status,
        organization_id: row.get(8),
    })
}

#[async_trait]
impl VehicleRepository for PostgresVehicleRepository {
    async fn get_vehicle(&self, vehicle_id: &str) -> DomainResult<Option<Vehicle>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT vehicle_id, license_plate, make, model, year, tank_capacity_liters, \
                 device_id, status, organization_id FROM vehicles WHERE vehicle_id = $1",
                &[&vehicle_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.as_ref().map(row_to_vehicle).transpose()
    }

    async fn set_status(
        &self,
        vehicle_id: &str,
        status: VehicleStatus,
        updated_at: i64,
    ) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "UPDATE vehicles SET status = $2, updated_at = $3 WHERE vehicle_id = $1",
            &[&vehicle_id, &status.as_str(), &updated_at],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(())
    }
}
