use crate::alert::{Alert, AlertResolution};
use crate::error::{DomainError, DomainResult};
use crate::repository::{AlertQuery, AlertRepository, ResolveAlertUpdate};
use std::sync::Arc;
use tracing::info;

/// Operator-facing alert operations. Alerts are created only by the
/// detection engine; this service owns the explicit resolve path.
pub struct AlertService {
    alerts: Arc<dyn AlertRepository>,
}

impl AlertService {
    pub fn new(alerts: Arc<dyn AlertRepository>) -> Self {
        Self { alerts }
    }

    pub async fn list_alerts(&self, query: AlertQuery) -> DomainResult<Vec<Alert>> {
        if query.organization_id.is_empty() {
            return Err(DomainError::InvalidInput(
                "organization id cannot be empty".to_string(),
            ));
        }
        self.alerts.list_alerts(query).await
    }

    /// Resolve an alert to a terminal status. The lookup is
    /// organization-scoped: an alert belonging to another organization reads
    /// as not found.
    pub async fn resolve_alert(
        &self,
        alert_id: &str,
        organization_id: &str,
        resolution: AlertResolution,
        resolved_by: &str,
        notes: Option<String>,
    ) -> DomainResult<()> {
        let alert = self
            .alerts
            .get_alert(alert_id)
            .await?
            .filter(|a| a.organization_id == organization_id)
            .ok_or_else(|| DomainError::AlertNotFound(alert_id.to_string()))?;

        self.alerts
            .resolve_alert(ResolveAlertUpdate {
                alert_id: alert.alert_id.clone(),
                status: resolution.into(),
                resolved_at: crate::now_millis(),
                resolved_by: resolved_by.to_string(),
                notes,
            })
            .await?;

        info!(
            alert_id = %alert.alert_id,
            resolved_by = %resolved_by,
            "alert resolved"
        );
        Ok(())
    }
}
