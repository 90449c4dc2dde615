pub mod alert;
pub mod alert_service;
pub mod credentials;
pub mod detection;
pub mod device;
pub mod error;
pub mod ingestion;
pub mod payload;
pub mod reading;
pub mod registry;
pub mod repository;
pub mod retention;
pub mod vehicle;
pub mod vehicle_service;

pub use alert::*;
pub use alert_service::AlertService;
pub use credentials::{CredentialService, DeviceIdentity};
pub use detection::DetectionEngine;
pub use device::*;
pub use error::{DomainError, DomainResult};
pub use ingestion::IngestionService;
pub use payload::{DevicePayload, PayloadError};
pub use reading::*;
pub use registry::{DeviceLink, DeviceRegistry, ProvisionDeviceInput, ProvisionedDevice};
pub use repository::{
    AlertQuery, AlertRepository, CredentialRepository, DeviceHealthUpdate, DeviceRepository,
    NotificationRequest, Notifier, ReadingRepository, RelatedEntity, ResolveAlertUpdate,
    VehicleRepository,
};
pub use retention::RetentionService;
pub use vehicle::*;
pub use vehicle_service::VehicleService;

/// Current wall-clock time as epoch milliseconds, the unit used for all
/// device-facing timestamps.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
