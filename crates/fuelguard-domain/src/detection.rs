use crate::alert::{Alert, AlertLocation, AlertStatus, AlertType, Severity};
use crate::error::DomainResult;
use crate::reading::FuelReading;
use crate::repository::{
    AlertRepository, DeviceHealthUpdate, DeviceRepository, NotificationRequest, Notifier,
    ReadingRepository, RelatedEntity, VehicleRepository,
};
use crate::vehicle::VehicleStatus;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Percentage drop above which a fast loss is treated as theft.
const THEFT_THRESHOLD_PERCENT: f64 = 10.0;
/// Window within which the drop must have happened, in minutes.
const THEFT_WINDOW_MINUTES: f64 = 5.0;

/// Sequential-comparison detector, evaluated once per appended reading.
/// Stateless across invocations: the comparison baseline lives in the
/// reading store.
pub struct DetectionEngine {
    readings: Arc<dyn ReadingRepository>,
    alerts: Arc<dyn AlertRepository>,
    devices: Arc<dyn DeviceRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    notifier: Arc<dyn Notifier>,
}

impl DetectionEngine {
    pub fn new(
        readings: Arc<dyn ReadingRepository>,
        alerts: Arc<dyn AlertRepository>,
        devices: Arc<dyn DeviceRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            readings,
            alerts,
            devices,
            vehicles,
            notifier,
        }
    }

    /// Compare the new reading against the vehicle's previous one and raise
    /// theft/tamper alerts as warranted. Always refreshes device and vehicle
    /// liveness, alert or not. Returns the alerts created.
    pub async fn evaluate(&self, reading: &FuelReading) -> DomainResult<Vec<Alert>> {
        let previous = self
            .readings
            .previous_before(&reading.vehicle_id, reading.timestamp)
            .await?;

        let mut raised = Vec::new();

        if let Some(previous) = previous {
            let fuel_drop_liters = previous.fuel_liters - reading.fuel_liters;
            let percent_drop = previous.fuel_percentage - reading.fuel_percentage;
            let minutes_elapsed = (reading.timestamp - previous.timestamp) as f64 / 60_000.0;

            debug!(
                vehicle_id = %reading.vehicle_id,
                percent_drop,
                minutes_elapsed,
                "comparing consecutive readings"
            );

            if percent_drop > THEFT_THRESHOLD_PERCENT && minutes_elapsed < THEFT_WINDOW_MINUTES {
                let alert = self
                    .raise(
                        reading,
                        AlertType::FuelTheft,
                        Severity::from_percent_drop(percent_drop),
                        fuel_drop_liters,
                        "Fuel Theft Detected",
                        format!(
                            "Vehicle {}: {:.1}L fuel loss detected",
                            reading.vehicle_id, fuel_drop_liters
                        ),
                    )
                    .await?;
                raised.push(alert);
            }

            // Edge-triggered: a continuously tampered sensor fires once.
            if reading.sensors.tamper && !previous.sensors.tamper {
                let alert = self
                    .raise(
                        reading,
                        AlertType::Tampering,
                        Severity::High,
                        0.0,
                        "Tamper Detected",
                        format!("Vehicle {}: Fuel tank cover opened", reading.vehicle_id),
                    )
                    .await?;
                raised.push(alert);
            }
        } else {
            debug!(
                vehicle_id = %reading.vehicle_id,
                "first reading for vehicle, no comparison baseline"
            );
        }

        self.devices
            .update_health(DeviceHealthUpdate {
                device_id: reading.device_id.clone(),
                last_seen: reading.timestamp,
                battery_level: reading.sensors.battery,
                signal_strength: reading.sensors.signal_strength,
            })
            .await?;
        self.vehicles
            .set_status(&reading.vehicle_id, VehicleStatus::Online, reading.timestamp)
            .await?;

        Ok(raised)
    }

    async fn raise(
        &self,
        reading: &FuelReading,
        alert_type: AlertType,
        severity: Severity,
        fuel_loss_liters: f64,
        title: &str,
        message: String,
    ) -> DomainResult<Alert> {
        let alert = Alert {
            alert_id: xid::new().to_string(),
            vehicle_id: reading.vehicle_id.clone(),
            device_id: reading.device_id.clone(),
            alert_type,
            fuel_loss_liters,
            location: reading.location.as_ref().map(AlertLocation::from),
            status: AlertStatus::Active,
            severity,
            detected_at: reading.timestamp,
            resolved_at: None,
            resolved_by: None,
            notes: None,
            organization_id: reading.organization_id.clone(),
        };

        self.alerts.create_alert(alert.clone()).await?;

        info!(
            alert_id = %alert.alert_id,
            vehicle_id = %alert.vehicle_id,
            alert_type = alert.alert_type.as_str(),
            severity = alert.severity.as_str(),
            "alert created"
        );

        // Notification is best-effort and decoupled from the alert write:
        // a dispatch failure never rolls the alert back.
        let notifier = Arc::clone(&self.notifier);
        let request = NotificationRequest {
            organization_id: alert.organization_id.clone(),
            notification_type: "alert".to_string(),
            title: title.to_string(),
            message,
            related_entity: Some(RelatedEntity {
                entity_type: "alert".to_string(),
                id: alert.alert_id.clone(),
            }),
        };
        let alert_id = alert.alert_id.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(request).await {
                warn!(alert_id = %alert_id, error = %e, "notification dispatch failed");
            }
        });

        Ok(alert)
    }
}
