use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use vitrine_core::AppError;

use crate::repository::UploadRecordRepository;

const DEFAULT_PERIOD_SECS: u64 = 300;

/// Periodically drops upload records whose targets expired unused.
#[derive(Clone)]
pub struct UploadCleanupService {
    records: Arc<dyn UploadRecordRepository>,
    period: Duration,
}

impl UploadCleanupService {
    pub fn new(records: Arc<dyn UploadRecordRepository>) -> Self {
        Self {
            records,
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Start the background task. The first sweep runs immediately.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Upload record cleanup failed");
                }
            }
        })
    }

    #[tracing::instrument(skip(self), fields(cleanup.operation = "prune_upload_records"))]
    pub async fn run_once(&self) -> Result<usize, AppError> {
        let pruned = self.records.prune_expired(Utc::now()).await?;
        if pruned > 0 {
            tracing::info!(pruned, "Pruned expired upload records");
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryUploadRecordRepository, UploadRecord, UploadRecordStatus};
    use uuid::Uuid;
    use vitrine_core::{AssetIntent, EntityType};

    fn pending(key: &str, expires_in: chrono::Duration) -> UploadRecord {
        let now = Utc::now();
        UploadRecord {
            upload_id: Uuid::new_v4(),
            entity_type: EntityType::Brand,
            entity_id: Uuid::new_v4(),
            intent: AssetIntent::logo(),
            storage_key: key.to_string(),
            final_asset_url: format!("https://cdn.test/{}", key),
            content_type: "image/png".to_string(),
            expected_size: 3,
            status: UploadRecordStatus::Pending,
            created_at: now,
            expires_at: now + expires_in,
            completed_at: None,
            failure_reason: None,
        }
    }

    #[tokio::test]
    async fn test_run_once_prunes_expired_records() {
        let records = Arc::new(InMemoryUploadRecordRepository::new());
        records
            .insert(pending("assets/old.png", chrono::Duration::hours(-1)))
            .await
            .unwrap();
        records
            .insert(pending("assets/new.png", chrono::Duration::minutes(15)))
            .await
            .unwrap();
        let cleanup = UploadCleanupService::new(records.clone());

        assert_eq!(cleanup.run_once().await.unwrap(), 1);
        assert_eq!(cleanup.run_once().await.unwrap(), 0);
        assert_eq!(records.len().await, 1);
    }

    #[tokio::test]
    async fn test_started_task_sweeps_in_the_background() {
        let records = Arc::new(InMemoryUploadRecordRepository::new());
        records
            .insert(pending("assets/old.png", chrono::Duration::hours(-1)))
            .await
            .unwrap();
        let handle = Arc::new(
            UploadCleanupService::new(records.clone()).with_period(Duration::from_millis(10)),
        )
        .start();

        let swept = tokio::time::timeout(Duration::from_secs(2), async {
            while !records.is_empty().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        handle.abort();
        assert!(swept.is_ok());
    }
}
