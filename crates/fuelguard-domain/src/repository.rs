use crate::alert::{Alert, AlertStatus, AlertType};
use crate::device::{Device, DeviceCredential, HealthStatus};
use crate::error::DomainResult;
use crate::reading::{FuelReading, NewFuelReading};
use crate::vehicle::{Vehicle, VehicleStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Health fields refreshed on every accepted reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceHealthUpdate {
    pub device_id: String,
    pub last_seen: i64,
    pub battery_level: f64,
    pub signal_strength: i32,
}

/// Resolution fields written by the operator-facing resolve operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveAlertUpdate {
    pub alert_id: String,
    pub status: AlertStatus,
    pub resolved_at: i64,
    pub resolved_by: String,
    pub notes: Option<String>,
}

/// Equality filters for listing alerts, always organization-scoped.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertQuery {
    pub organization_id: String,
    pub vehicle_id: Option<String>,
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub limit: i64,
}

/// Append-only store for normalized readings.
/// Infrastructure layer (fuelguard-postgres) implements this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Append a reading and return its id. Idempotent on
    /// (device_id, timestamp): a redelivered message returns the id of the
    /// already-persisted row.
    async fn append(&self, reading: NewFuelReading) -> DomainResult<String>;

    /// Most recent reading for the vehicle strictly before `timestamp`.
    /// `None` for a first-ever reading is a valid terminal state.
    async fn previous_before(
        &self,
        vehicle_id: &str,
        timestamp: i64,
    ) -> DomainResult<Option<FuelReading>>;

    /// Latest readings for a vehicle, newest first, organization-scoped.
    async fn list_recent(
        &self,
        vehicle_id: &str,
        organization_id: &str,
        limit: i64,
    ) -> DomainResult<Vec<FuelReading>>;

    /// Bounded retention delete; returns the number of rows removed.
    /// Deleting zero rows is success.
    async fn purge_older_than(&self, cutoff_millis: i64, batch_limit: i64) -> DomainResult<u64>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn create_device(&self, device: Device) -> DomainResult<()>;

    async fn get_device(&self, device_id: &str) -> DomainResult<Option<Device>>;

    async fn list_devices(&self, organization_id: &str) -> DomainResult<Vec<Device>>;

    /// Mark online and refresh last_seen/battery/signal in one write.
    async fn update_health(&self, update: DeviceHealthUpdate) -> DomainResult<()>;

    /// Set the health status alone; `last_seen` is refreshed when provided.
    async fn set_health_status(
        &self,
        device_id: &str,
        status: HealthStatus,
        last_seen: Option<i64>,
    ) -> DomainResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn get_vehicle(&self, vehicle_id: &str) -> DomainResult<Option<Vehicle>>;

    async fn set_status(
        &self,
        vehicle_id: &str,
        status: VehicleStatus,
        updated_at: i64,
    ) -> DomainResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create_alert(&self, alert: Alert) -> DomainResult<()>;

    async fn get_alert(&self, alert_id: &str) -> DomainResult<Option<Alert>>;

    async fn list_alerts(&self, query: AlertQuery) -> DomainResult<Vec<Alert>>;

    async fn resolve_alert(&self, update: ResolveAlertUpdate) -> DomainResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert or replace the credential row for a device. Replacement is the
    /// rotation mechanism: the previous hash stops verifying immediately.
    async fn upsert_credential(&self, credential: DeviceCredential) -> DomainResult<()>;

    async fn get_credential(&self, device_id: &str) -> DomainResult<Option<DeviceCredential>>;

    /// Flag the credential revoked. Returns false when no row exists.
    async fn revoke_credential(
        &self,
        device_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> DomainResult<bool>;
}

/// Outbound notification request handed to the external notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub organization_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntity {
    pub entity_type: String,
    pub id: String,
}

/// External notification fan-out. Fire-and-forget at every call site:
/// failures are logged and never propagated past this boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request: NotificationRequest) -> DomainResult<()>;
}
