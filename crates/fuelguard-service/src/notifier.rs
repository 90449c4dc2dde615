use async_trait::async_trait;
use fuelguard_domain::{DomainResult, NotificationRequest, Notifier};
use tracing::info;

/// Notification sink that emits structured log records. Stands in for a push
/// or email channel; alert persistence never depends on it succeeding.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, request: NotificationRequest) -> DomainResult<()> {
        info!(
            organization_id = %request.organization_id,
            notification_type = %request.notification_type,
            title = %request.title,
            message = %request.message,
            related_entity_id = request
                .related_entity
                .as_ref()
                .map(|entity| entity.id.as_str())
                .unwrap_or(""),
            "notification dispatched"
        );
        Ok(())
    }
}
