use crate::credentials::CredentialService;
use crate::device::{Device, DeviceConfiguration, HealthStatus};
use crate::error::{DomainError, DomainResult};
use crate::repository::{DeviceHealthUpdate, DeviceRepository};
use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolved device identity used to attribute a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLink {
    pub vehicle_id: String,
    pub organization_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionDeviceInput {
    pub serial_number: String,
    pub firmware_version: String,
    pub configuration: Option<DeviceConfiguration>,
    pub vehicle_id: Option<String>,
    pub organization_id: String,
}

/// Provisioning result. The token is plaintext exactly here and nowhere
/// else; callers must treat it as shown-once.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedDevice {
    pub device: Device,
    pub token: String,
}

/// Device identity resolution, health tracking, and provisioning.
pub struct DeviceRegistry {
    devices: Arc<dyn DeviceRepository>,
    credentials: Arc<CredentialService>,
}

impl DeviceRegistry {
    pub fn new(devices: Arc<dyn DeviceRepository>, credentials: Arc<CredentialService>) -> Self {
        Self {
            devices,
            credentials,
        }
    }

    /// Resolve a device to its vehicle/organization. A device that exists
    /// but has no vehicle link cannot have fuel data attributed to it, so
    /// ingestion drops it.
    pub async fn resolve(&self, device_id: &str) -> DomainResult<DeviceLink> {
        let device = self
            .devices
            .get_device(device_id)
            .await?
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))?;

        let vehicle_id = device
            .vehicle_id
            .ok_or_else(|| DomainError::DeviceUnassigned(device_id.to_string()))?;

        Ok(DeviceLink {
            vehicle_id,
            organization_id: device.organization_id,
        })
    }

    /// Organization-scoped device lookup; a mismatched organization reads as
    /// not found so nothing leaks across tenants.
    pub async fn get_device(&self, device_id: &str, organization_id: &str) -> DomainResult<Device> {
        let device = self
            .devices
            .get_device(device_id)
            .await?
            .filter(|d| d.organization_id == organization_id)
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))?;
        Ok(device)
    }

    pub async fn list_devices(&self, organization_id: &str) -> DomainResult<Vec<Device>> {
        self.devices.list_devices(organization_id).await
    }

    /// Refresh liveness fields from an accepted reading.
    pub async fn record_health(
        &self,
        device_id: &str,
        timestamp: i64,
        battery_level: f64,
        signal_strength: i32,
    ) -> DomainResult<()> {
        debug!(device_id = %device_id, "recording device health");
        self.devices
            .update_health(DeviceHealthUpdate {
                device_id: device_id.to_string(),
                last_seen: timestamp,
                battery_level,
                signal_strength,
            })
            .await
    }

    /// Status-topic update: only liveness, no detection involvement.
    pub async fn record_status(
        &self,
        device_id: &str,
        online: bool,
        timestamp: i64,
    ) -> DomainResult<()> {
        let status = if online {
            HealthStatus::Online
        } else {
            HealthStatus::Offline
        };
        self.devices
            .set_health_status(device_id, status, Some(timestamp))
            .await
    }

    pub async fn mark_offline(&self, device_id: &str) -> DomainResult<()> {
        self.devices
            .set_health_status(device_id, HealthStatus::Offline, None)
            .await
    }

    pub async fn mark_error(&self, device_id: &str) -> DomainResult<()> {
        self.devices
            .set_health_status(device_id, HealthStatus::Error, None)
            .await
    }

    /// Create a device record with a collision-resistant random id, issue
    /// its credential, and return both. The token appears only in the
    /// response.
    pub async fn provision(&self, input: ProvisionDeviceInput) -> DomainResult<ProvisionedDevice> {
        if input.serial_number.is_empty() {
            return Err(DomainError::InvalidInput(
                "serial number cannot be empty".to_string(),
            ));
        }
        if input.organization_id.is_empty() {
            return Err(DomainError::InvalidInput(
                "organization id cannot be empty".to_string(),
            ));
        }

        let device_id = generate_device_id();
        let now = Utc::now();

        let device = Device {
            device_id: device_id.clone(),
            serial_number: input.serial_number,
            firmware_version: input.firmware_version,
            vehicle_id: input.vehicle_id,
            organization_id: input.organization_id.clone(),
            health_status: HealthStatus::Offline,
            last_seen: now.timestamp_millis(),
            battery_level: 0.0,
            signal_strength: 0,
            configuration: input.configuration.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        self.devices.create_device(device.clone()).await?;
        let token = self
            .credentials
            .issue(&device_id, &input.organization_id)
            .await?;

        info!(device_id = %device_id, organization_id = %input.organization_id, "provisioned device");
        Ok(ProvisionedDevice { device, token })
    }

    /// Mint a replacement token for an existing device.
    pub async fn rotate_credentials(
        &self,
        device_id: &str,
        organization_id: &str,
    ) -> DomainResult<String> {
        self.get_device(device_id, organization_id).await?;
        self.credentials.rotate(device_id, organization_id).await
    }

    /// Revoke the credential and flag the device record in error.
    pub async fn revoke_device(&self, device_id: &str, organization_id: &str) -> DomainResult<()> {
        self.get_device(device_id, organization_id).await?;
        self.credentials.revoke(device_id).await?;
        self.mark_error(device_id).await?;
        info!(device_id = %device_id, "device revoked");
        Ok(())
    }
}

fn generate_device_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("dev_{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CredentialRepository, MockDeviceRepository};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::predicate::eq;

    struct NullCredentials;

    #[async_trait]
    impl CredentialRepository for NullCredentials {
        async fn upsert_credential(
            &self,
            _credential: crate::device::DeviceCredential,
        ) -> DomainResult<()> {
            Ok(())
        }

        async fn get_credential(
            &self,
            _device_id: &str,
        ) -> DomainResult<Option<crate::device::DeviceCredential>> {
            Ok(None)
        }

        async fn revoke_credential(
            &self,
            _device_id: &str,
            _revoked_at: DateTime<Utc>,
        ) -> DomainResult<bool> {
            Ok(true)
        }
    }

    fn credentials() -> Arc<CredentialService> {
        Arc::new(CredentialService::new(
            Arc::new(NullCredentials),
            "test-secret".to_string(),
        ))
    }

    fn sample_device(vehicle_id: Option<&str>, organization_id: &str) -> Device {
        Device {
            device_id: "dev_1".to_string(),
            serial_number: "SN-1".to_string(),
            firmware_version: "1.0.0".to_string(),
            vehicle_id: vehicle_id.map(str::to_string),
            organization_id: organization_id.to_string(),
            health_status: HealthStatus::Offline,
            last_seen: 0,
            battery_level: 0.0,
            signal_strength: 0,
            configuration: DeviceConfiguration::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_resolve_assigned_device() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device()
            .with(eq("dev_1"))
            .returning(|_| Ok(Some(sample_device(Some("veh-9"), "org-a"))));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        let link = registry.resolve("dev_1").await.unwrap();
        assert_eq!(link.vehicle_id, "veh-9");
        assert_eq!(link.organization_id, "org-a");
    }

    #[tokio::test]
    async fn test_resolve_unknown_device() {
        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|_| Ok(None));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        assert!(matches!(
            registry.resolve("dev_x").await.unwrap_err(),
            DomainError::DeviceNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_resolve_unassigned_device() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device()
            .returning(|_| Ok(Some(sample_device(None, "org-a"))));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        assert!(matches!(
            registry.resolve("dev_1").await.unwrap_err(),
            DomainError::DeviceUnassigned(_)
        ));
    }

    #[tokio::test]
    async fn test_get_device_hides_other_organizations() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device()
            .returning(|_| Ok(Some(sample_device(Some("veh-9"), "org-b"))));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        assert!(matches!(
            registry.get_device("dev_1", "org-a").await.unwrap_err(),
            DomainError::DeviceNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_provision_generates_id_and_token() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_create_device()
            .withf(|device: &Device| {
                device.device_id.starts_with("dev_")
                    && device.device_id.len() == 4 + 32
                    && device.health_status == HealthStatus::Offline
                    && device.configuration == DeviceConfiguration::default()
            })
            .returning(|_| Ok(()));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        let provisioned = registry
            .provision(ProvisionDeviceInput {
                serial_number: "SN-42".to_string(),
                firmware_version: "2.1.0".to_string(),
                configuration: None,
                vehicle_id: None,
                organization_id: "org-a".to_string(),
            })
            .await
            .unwrap();

        assert!(!provisioned.token.is_empty());
        assert_eq!(provisioned.device.serial_number, "SN-42");
    }

    #[tokio::test]
    async fn test_provision_rejects_empty_serial() {
        let registry = DeviceRegistry::new(Arc::new(MockDeviceRepository::new()), credentials());
        let err = registry
            .provision(ProvisionDeviceInput {
                serial_number: String::new(),
                firmware_version: "2.1.0".to_string(),
                configuration: None,
                vehicle_id: None,
                organization_id: "org-a".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_record_status_offline() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_set_health_status()
            .withf(|id, status, last_seen| {
                id == "dev_1" && *status == HealthStatus::Offline && last_seen.is_some()
            })
            .returning(|_, _, _| Ok(()));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        registry.record_status("dev_1", false, 123).await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_device_marks_error() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device()
            .returning(|_| Ok(Some(sample_device(Some("veh-9"), "org-a"))));
        devices
            .expect_set_health_status()
            .with(eq("dev_1"), eq(HealthStatus::Error), eq(None))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let registry = DeviceRegistry::new(Arc::new(devices), credentials());
        registry.revoke_device("dev_1", "org-a").await.unwrap();
    }
}
