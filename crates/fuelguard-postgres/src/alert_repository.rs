use crate::client::PostgresClient;
use async_trait::async_trait;
use fuelguard_domain::{
    Alert, AlertLocation, AlertQuery, AlertRepository, AlertStatus, AlertType, DomainError,
    DomainResult, ResolveAlertUpdate, Severity,
};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::instrument;

const ALERT_COLUMNS: &str = "alert_id, vehicle_id, device_id, alert_type, fuel_loss_liters, \
     gps_lat, gps_lon, status, severity, detected_at, resolved_at, resolved_by, notes, \
     organization_id";

/// PostgreSQL implementation of AlertRepository.
#[derive(Clone)]
pub struct PostgresAlertRepository {
    client: PostgresClient,
}

impl PostgresAlertRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

fn row_to_alert(row: &Row) -> DomainResult<Alert> {
    let alert_type: String = row.get(3);
    let status: String = row.get(7);
    let severity: String = row.get(8);

    let alert_type = AlertType::parse(&alert_type).ok_or_else(|| {
        DomainError::RepositoryError(anyhow::anyhow!("unknown alert type: {}", alert_type))
    })?;
    let status = AlertStatus::parse(&status).ok_or_else(|| {
        DomainError::RepositoryError(anyhow::anyhow!("unknown alert status: {}", status))
    })?;
    let severity = Severity::parse(&severity).ok_or_else(|| {
        DomainError::RepositoryError(anyhow::anyhow!("unknown severity: {}", severity))
    })?;

    let gps_lat: Option<f64> = row.get(5);
    let location = gps_lat.map(|lat| AlertLocation { lat, lon: row.get(6) });

    Ok(Alert {
        alert_id: row.get(0),
        vehicle_id: row.get(1),
        device_id: row.get(2),
        alert_type,
        fuel_loss_liters: row.get(4),
        location,
        status,
        severity,
        detected_at: row.get(9),
        resolved_at: row.get(10),
        resolved_by: row.get(11),
        notes: row.get(12),
        organization_id: row.get(13),
    })
}

#[async_trait]
impl AlertRepository for PostgresAlertRepository {
    #[instrument(skip(self, alert), fields(alert_id = %alert.alert_id, vehicle_id = %alert.vehicle_id))]
    async fn create_alert(&self, alert: Alert) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let (gps_lat, gps_lon) = match &alert.location {
            Some(l) => (Some(l.lat), Some(l.lon)),
            None => (None, None),
        };

        conn.execute(
            "INSERT INTO alerts (alert_id, vehicle_id, device_id, alert_type, fuel_loss_liters, \
             gps_lat, gps_lon, status, severity, detected_at, resolved_at, resolved_by, notes, \
             organization_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            &[
                &alert.alert_id,
                &alert.vehicle_id,
                &alert.device_id,
                &alert.alert_type.as_str(),
                &alert.fuel_loss_liters,
                &gps_lat,
                &gps_lon,
                &alert.status.as_str(),
                &alert.severity.as_str(),
                &alert.detected_at,
                &alert.resolved_at,
                &alert.resolved_by,
                &alert.notes,
                &alert.organization_id,
            ],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(())
    }

    async fn get_alert(&self, alert_id: &str) -> DomainResult<Option<Alert>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = $1"),
                &[&alert_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.as_ref().map(row_to_alert).transpose()
    }

    async fn list_alerts(&self, query: AlertQuery) -> DomainResult<Vec<Alert>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let mut sql = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE organization_id = $1");
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
            vec![Box::new(query.organization_id.clone())];

        if let Some(vehicle_id) = &query.vehicle_id {
            params.push(Box::new(vehicle_id.clone()));
            sql.push_str(&format!(" AND vehicle_id = ${}", params.len()));
        }
        if let Some(status) = query.status {
            params.push(Box::new(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ${}", params.len()));
        }
        if let Some(alert_type) = query.alert_type {
            params.push(Box::new(alert_type.as_str().to_string()));
            sql.push_str(&format!(" AND alert_type = ${}", params.len()));
        }

        params.push(Box::new(query.limit));
        sql.push_str(&format!(
            " ORDER BY detected_at DESC LIMIT ${}",
            params.len()
        ));

        let param_refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let rows = conn
            .query(&sql, &param_refs)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        rows.iter().map(row_to_alert).collect()
    }

    async fn resolve_alert(&self, update: ResolveAlertUpdate) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = conn
            .execute(
                "UPDATE alerts SET status = $2, resolved_at = $3, resolved_by = $4, notes = $5 \
                 WHERE alert_id = $1",
                &[
                    &update.alert_id,
                    &update.status.as_str(),
                    &update.resolved_at,
                    &update.resolved_by,
                    &update.notes,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if updated == 0 {
            return Err(DomainError::AlertNotFound(update.alert_id));
        }
        Ok(())
    }
}
