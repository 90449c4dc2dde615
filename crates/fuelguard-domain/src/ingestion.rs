use crate::detection::DetectionEngine;
use crate::error::{DomainError, DomainResult};
use crate::payload::{DevicePayload, PayloadError};
use crate::reading::FuelReading;
use crate::registry::DeviceRegistry;
use crate::repository::ReadingRepository;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Wire shape published on `fuelguard/devices/{device_id}/status`.
#[derive(Debug, Deserialize)]
struct StatusPayload {
    online: bool,
}

/// Orchestrates one inbound transport message: validate, resolve identity,
/// persist, detect. Every branch is terminal; validation, identity, and
/// storage failures are logged and the message dropped, never retried
/// (redelivery would fail identically).
pub struct IngestionService {
    registry: Arc<DeviceRegistry>,
    readings: Arc<dyn ReadingRepository>,
    detection: Arc<DetectionEngine>,
}

impl IngestionService {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        readings: Arc<dyn ReadingRepository>,
        detection: Arc<DetectionEngine>,
    ) -> Self {
        Self {
            registry,
            readings,
            detection,
        }
    }

    /// Handle a data-topic message. The message is considered consumed once
    /// validation and persistence succeed; a detection failure after that is
    /// logged but does not un-acknowledge the message, to avoid redelivery
    /// loops.
    pub async fn handle_data(&self, topic_device_id: &str, payload: &[u8]) -> DomainResult<()> {
        let payload = DevicePayload::parse(payload)?;

        if payload.device_id != topic_device_id {
            warn!(
                topic_device_id = %topic_device_id,
                payload_device_id = %payload.device_id,
                "device id in payload differs from topic"
            );
        }

        let link = self.registry.resolve(&payload.device_id).await?;

        let timestamp = payload.timestamp;
        let device_id = payload.device_id.clone();
        let new_reading = payload.into_reading(link.vehicle_id.clone(), link.organization_id);
        let reading_id = self.readings.append(new_reading.clone()).await?;

        info!(
            device_id = %device_id,
            vehicle_id = %link.vehicle_id,
            reading_id = %reading_id,
            timestamp,
            "fuel reading stored"
        );

        let stored = FuelReading::from_new(reading_id, new_reading);
        if let Err(e) = self.detection.evaluate(&stored).await {
            error!(
                device_id = %device_id,
                vehicle_id = %link.vehicle_id,
                error = %e,
                "detection failed for stored reading"
            );
        }

        Ok(())
    }

    /// Handle a status-topic message: liveness only, detection bypassed.
    pub async fn handle_status(&self, device_id: &str, payload: &[u8]) -> DomainResult<()> {
        let status: StatusPayload = serde_json::from_slice(payload)
            .map_err(|e| DomainError::InvalidPayload(PayloadError::Malformed(e.to_string())))?;

        debug!(device_id = %device_id, online = status.online, "device status update");
        self.registry
            .record_status(device_id, status.online, crate::now_millis())
            .await
    }
}
