use crate::error::DomainResult;
use crate::repository::ReadingRepository;
use std::sync::Arc;
use tracing::info;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Time-based retention sweep over the reading store. Safe to run
/// repeatedly: deleting zero rows is success.
pub struct RetentionService {
    readings: Arc<dyn ReadingRepository>,
    retention_days: i64,
    batch_limit: i64,
}

impl RetentionService {
    pub fn new(readings: Arc<dyn ReadingRepository>, retention_days: i64, batch_limit: i64) -> Self {
        Self {
            readings,
            retention_days,
            batch_limit,
        }
    }

    /// Delete readings older than the retention window in bounded batches
    /// until a batch comes back short. Returns the total rows removed.
    pub async fn run_once(&self, now_millis: i64) -> DomainResult<u64> {
        let cutoff = now_millis - self.retention_days * MILLIS_PER_DAY;
        let mut total = 0u64;

        loop {
            let deleted = self
                .readings
                .purge_older_than(cutoff, self.batch_limit)
                .await?;
            total += deleted;
            if deleted < self.batch_limit as u64 {
                break;
            }
        }

        if total > 0 {
            info!(deleted = total, cutoff, "retention sweep removed readings");
        }
        Ok(total)
    }
}
