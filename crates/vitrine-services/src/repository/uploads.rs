use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use vitrine_core::{AppError, AssetIntent, EntityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadRecordStatus {
    Pending,
    Completed,
    Failed,
}

/// How long after its target expires a pending upload may still be
/// reported complete. Covers PUTs that started just before expiry.
pub const COMPLETION_GRACE_SECS: i64 = 60;

/// An issued upload target and what is known about the object behind it.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRecord {
    pub upload_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub intent: AssetIntent,
    pub storage_key: String,
    pub final_asset_url: String,
    pub content_type: String,
    pub expected_size: u64,
    pub status: UploadRecordStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl UploadRecord {
    /// Last instant a completion for this record is accepted
    pub fn completion_deadline(&self) -> DateTime<Utc> {
        self.expires_at + Duration::seconds(COMPLETION_GRACE_SECS)
    }

    pub fn accepts_completion_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.completion_deadline()
    }

    /// Unfinished records past their deadline are dropped by pruning.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        self.status != UploadRecordStatus::Completed && !self.accepts_completion_at(now)
    }
}

#[async_trait]
pub trait UploadRecordRepository: Send + Sync {
    async fn insert(&self, record: UploadRecord) -> Result<(), AppError>;

    async fn find_by_key(&self, storage_key: &str) -> Result<Option<UploadRecord>, AppError>;

    async fn find_by_url(&self, final_asset_url: &str) -> Result<Option<UploadRecord>, AppError>;

    async fn mark_completed(
        &self,
        upload_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<UploadRecord, AppError>;

    async fn mark_failed(&self, upload_id: Uuid, reason: String) -> Result<UploadRecord, AppError>;

    /// Remove pending and failed records whose completion deadline has
    /// passed. Returns how many were removed.
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

#[derive(Default)]
struct RecordTable {
    records: HashMap<Uuid, UploadRecord>,
    by_key: HashMap<String, Uuid>,
    by_url: HashMap<String, Uuid>,
}

impl RecordTable {
    fn lookup(&self, index: &HashMap<String, Uuid>, value: &str) -> Option<UploadRecord> {
        index
            .get(value)
            .and_then(|id| self.records.get(id))
            .cloned()
    }

    fn remove(&mut self, upload_id: &Uuid) {
        if let Some(record) = self.records.remove(upload_id) {
            self.by_key.remove(&record.storage_key);
            self.by_url.remove(&record.final_asset_url);
        }
    }
}

/// Upload records kept in process memory, indexed by storage key and URL
#[derive(Clone, Default)]
pub struct InMemoryUploadRecordRepository {
    table: Arc<RwLock<RecordTable>>,
}

impl InMemoryUploadRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.records.is_empty()
    }

    async fn update<F>(&self, upload_id: Uuid, apply: F) -> Result<UploadRecord, AppError>
    where
        F: FnOnce(&mut UploadRecord) + Send,
    {
        let mut table = self.table.write().await;
        let record = table
            .records
            .get_mut(&upload_id)
            .ok_or_else(|| AppError::NotFound(format!("Upload {} not found", upload_id)))?;
        apply(record);
        Ok(record.clone())
    }
}

#[async_trait]
impl UploadRecordRepository for InMemoryUploadRecordRepository {
    async fn insert(&self, record: UploadRecord) -> Result<(), AppError> {
        let mut table = self.table.write().await;
        if table.records.contains_key(&record.upload_id) {
            return Err(AppError::Conflict(format!(
                "Upload {} already exists",
                record.upload_id
            )));
        }
        if table.by_key.contains_key(&record.storage_key) {
            return Err(AppError::Conflict(format!(
                "Storage key {} is already issued",
                record.storage_key
            )));
        }
        table
            .by_key
            .insert(record.storage_key.clone(), record.upload_id);
        table
            .by_url
            .insert(record.final_asset_url.clone(), record.upload_id);
        table.records.insert(record.upload_id, record);
        Ok(())
    }

    async fn find_by_key(&self, storage_key: &str) -> Result<Option<UploadRecord>, AppError> {
        let table = self.table.read().await;
        Ok(table.lookup(&table.by_key, storage_key))
    }

    async fn find_by_url(&self, final_asset_url: &str) -> Result<Option<UploadRecord>, AppError> {
        let table = self.table.read().await;
        Ok(table.lookup(&table.by_url, final_asset_url))
    }

    async fn mark_completed(
        &self,
        upload_id: Uuid,
        completed_at: DateTime<Utc>,
    ) -> Result<UploadRecord, AppError> {
        self.update(upload_id, |record| {
            record.status = UploadRecordStatus::Completed;
            record.completed_at = Some(completed_at);
            record.failure_reason = None;
        })
        .await
    }

    async fn mark_failed(&self, upload_id: Uuid, reason: String) -> Result<UploadRecord, AppError> {
        self.update(upload_id, |record| {
            record.status = UploadRecordStatus::Failed;
            record.failure_reason = Some(reason);
        })
        .await
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let mut table = self.table.write().await;
        let stale: Vec<Uuid> = table
            .records
            .values()
            .filter(|record| record.is_stale_at(now))
            .map(|record| record.upload_id)
            .collect();
        for upload_id in &stale {
            table.remove(upload_id);
        }
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> UploadRecord {
        let now = Utc::now();
        UploadRecord {
            upload_id: Uuid::new_v4(),
            entity_type: EntityType::Project,
            entity_id: Uuid::new_v4(),
            intent: AssetIntent::image(),
            storage_key: key.to_string(),
            final_asset_url: format!("https://cdn.test/{}", key),
            content_type: "image/png".to_string(),
            expected_size: 10,
            status: UploadRecordStatus::Pending,
            created_at: now,
            expires_at: now + Duration::minutes(15),
            completed_at: None,
            failure_reason: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let repo = InMemoryUploadRecordRepository::new();
        let rec = record("assets/a.png");
        repo.insert(rec.clone()).await.unwrap();

        let by_key = repo.find_by_key("assets/a.png").await.unwrap().unwrap();
        assert_eq!(by_key.upload_id, rec.upload_id);
        let by_url = repo
            .find_by_url("https://cdn.test/assets/a.png")
            .await
            .unwrap();
        assert!(by_url.is_some());
        assert!(repo.find_by_key("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let repo = InMemoryUploadRecordRepository::new();
        let rec = record("assets/a.png");
        repo.insert(rec.clone()).await.unwrap();
        assert!(matches!(
            repo.insert(rec).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let repo = InMemoryUploadRecordRepository::new();
        let rec = record("assets/a.png");
        repo.insert(rec.clone()).await.unwrap();

        let failed = repo
            .mark_failed(rec.upload_id, "size mismatch".to_string())
            .await
            .unwrap();
        assert_eq!(failed.status, UploadRecordStatus::Failed);

        let done = repo.mark_completed(rec.upload_id, Utc::now()).await.unwrap();
        assert_eq!(done.status, UploadRecordStatus::Completed);
        assert!(done.failure_reason.is_none());

        assert!(matches!(
            repo.mark_completed(Uuid::new_v4(), Utc::now()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_prune_drops_only_unfinished_records_past_deadline() {
        let repo = InMemoryUploadRecordRepository::new();
        let now = Utc::now();
        let past = now - Duration::seconds(COMPLETION_GRACE_SECS + 1);

        let mut abandoned = record("assets/abandoned.png");
        abandoned.expires_at = past;
        let mut rejected = record("assets/rejected.png");
        rejected.expires_at = past;
        rejected.status = UploadRecordStatus::Failed;
        let mut done = record("assets/done.png");
        done.expires_at = past;
        done.status = UploadRecordStatus::Completed;
        let mut in_grace = record("assets/in-grace.png");
        in_grace.expires_at = now - Duration::seconds(1);
        let live = record("assets/live.png");

        for rec in [&abandoned, &rejected, &done, &in_grace, &live] {
            repo.insert(rec.clone()).await.unwrap();
        }

        assert_eq!(repo.prune_expired(now).await.unwrap(), 2);
        assert_eq!(repo.len().await, 3);
        assert!(repo.find_by_key("assets/abandoned.png").await.unwrap().is_none());
        assert!(repo
            .find_by_url("https://cdn.test/assets/rejected.png")
            .await
            .unwrap()
            .is_none());
        assert!(repo.find_by_key("assets/done.png").await.unwrap().is_some());
        assert!(repo.find_by_key("assets/in-grace.png").await.unwrap().is_some());
        assert!(repo.find_by_key("assets/live.png").await.unwrap().is_some());

        // A pruned key can be issued again.
        let mut reissued = record("assets/abandoned.png");
        reissued.expires_at = now + Duration::minutes(5);
        repo.insert(reissued).await.unwrap();
        assert_eq!(repo.prune_expired(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_many_expired_records_are_all_pruned() {
        let repo = InMemoryUploadRecordRepository::new();
        let now = Utc::now();
        for i in 0..500 {
            let mut rec = record(&format!("assets/{}.png", i));
            rec.expires_at = now - Duration::minutes(10);
            repo.insert(rec).await.unwrap();
        }
        repo.insert(record("assets/fresh.png")).await.unwrap();

        assert_eq!(repo.prune_expired(now).await.unwrap(), 500);
        assert_eq!(repo.len().await, 1);
    }

    #[test]
    fn test_completion_deadline_includes_grace() {
        let rec = record("assets/a.png");
        assert!(rec.accepts_completion_at(rec.expires_at));
        assert!(rec.accepts_completion_at(rec.completion_deadline()));
        assert!(!rec.accepts_completion_at(rec.completion_deadline() + Duration::seconds(1)));
        assert!(rec.is_stale_at(rec.completion_deadline() + Duration::seconds(1)));
    }
}
