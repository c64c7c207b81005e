//! Job store: the in-memory mirror of the `jobs` table, with item/type scoped lookups.
//!
//! Refresh behavior is an explicit [`CachePolicy`]. The default, `Once`, never
//! refetches while any job is held locally, so results attached server-side by
//! the external worker only show up after `invalidate()` or a restart.

use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{ItemId, Job, JobId, JobPatch, JobType, NewJob};
use crate::store::{
    fetch_rows, insert_rows, read_guard, update_row, write_guard, IdClock, RowStore, StoreError,
    Table,
};

pub mod handlers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Skip the fetch whenever jobs are already held locally.
    Once,
    /// Refetch when the last successful fetch is older than the duration.
    Ttl(Duration),
    /// Fetch on every call.
    Always,
}

impl FromStr for CachePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "once" => Ok(CachePolicy::Once),
            "always" => Ok(CachePolicy::Always),
            _ => s
                .strip_prefix("ttl:")
                .and_then(|secs| secs.trim().parse::<u64>().ok())
                .map(|secs| CachePolicy::Ttl(Duration::from_secs(secs)))
                .ok_or_else(|| format!("expected once, always or ttl:<seconds>, got '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "count", rename_all = "snake_case")]
pub enum FetchOutcome {
    Refreshed(usize),
    Cached(usize),
}

#[derive(Default)]
struct JobCache {
    jobs: Vec<Job>,
    loaded_at: Option<Instant>,
    invalidated: bool,
}

impl JobCache {
    fn is_fresh(&self, policy: CachePolicy) -> bool {
        if self.invalidated {
            return false;
        }
        match policy {
            CachePolicy::Once => !self.jobs.is_empty(),
            CachePolicy::Ttl(ttl) => self.loaded_at.is_some_and(|at| at.elapsed() < ttl),
            CachePolicy::Always => false,
        }
    }
}

pub struct JobStore {
    backend: Arc<dyn RowStore>,
    policy: CachePolicy,
    ids: IdClock,
    cache: RwLock<JobCache>,
}

impl JobStore {
    pub fn new(backend: Arc<dyn RowStore>, policy: CachePolicy) -> Self {
        Self {
            backend,
            policy,
            ids: IdClock::new(),
            cache: RwLock::new(JobCache::default()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub async fn fetch_all(&self) -> Result<FetchOutcome, StoreError> {
        {
            let cache = read_guard(&self.cache);
            if cache.is_fresh(self.policy) {
                debug!("Job cache is fresh ({} jobs), skipping fetch", cache.jobs.len());
                return Ok(FetchOutcome::Cached(cache.jobs.len()));
            }
        }
        let jobs: Vec<Job> = fetch_rows(self.backend.as_ref(), Table::Jobs)
            .await
            .inspect_err(|e| warn!("Failed to fetch jobs: {e}"))?;
        let count = jobs.len();
        let mut cache = write_guard(&self.cache);
        cache.jobs = jobs;
        cache.loaded_at = Some(Instant::now());
        cache.invalidated = false;
        info!("Loaded {count} jobs");
        Ok(FetchOutcome::Refreshed(count))
    }

    /// Forces the next `fetch_all` to hit the row store regardless of policy.
    pub fn invalidate(&self) {
        write_guard(&self.cache).invalidated = true;
    }

    pub async fn add(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let job = Job::from_new(self.ids.next_id(), Utc::now(), new_job);
        insert_rows(self.backend.as_ref(), Table::Jobs, std::slice::from_ref(&job))
            .await
            .inspect_err(|e| warn!("Failed to add {} job for item {}: {e}", job.job_type, job.item_id))?;
        write_guard(&self.cache).jobs.push(job.clone());
        info!("Added {} job {} for item {}", job.job_type, job.id, job.item_id);
        Ok(job)
    }

    /// Merges `patch` into the job. `Ok(None)` when the id is not held locally.
    pub async fn update(&self, id: JobId, patch: JobPatch) -> Result<Option<Job>, StoreError> {
        if self.get_by_id(id).is_none() {
            return Ok(None);
        }
        update_row(self.backend.as_ref(), Table::Jobs, id, &patch)
            .await
            .inspect_err(|e| warn!("Failed to update job {id}: {e}"))?;
        let mut cache = write_guard(&self.cache);
        Ok(cache.jobs.iter_mut().find(|j| j.id == id).map(|job| {
            job.apply(&patch);
            job.clone()
        }))
    }

    pub async fn delete(&self, id: JobId) -> Result<bool, StoreError> {
        if self.get_by_id(id).is_none() {
            return Ok(false);
        }
        self.backend
            .delete_by_id(Table::Jobs, id)
            .await
            .inspect_err(|e| warn!("Failed to delete job {id}: {e}"))?;
        let mut cache = write_guard(&self.cache);
        let before = cache.jobs.len();
        cache.jobs.retain(|j| j.id != id);
        Ok(cache.jobs.len() != before)
    }

    pub fn all(&self) -> Vec<Job> {
        read_guard(&self.cache).jobs.clone()
    }

    pub fn get_by_id(&self, id: JobId) -> Option<Job> {
        read_guard(&self.cache).jobs.iter().find(|j| j.id == id).cloned()
    }

    pub fn get_by_item_id(&self, item_id: ItemId) -> Vec<Job> {
        self.filtered(|j| j.item_id == item_id)
    }

    pub fn get_by_type(&self, job_type: JobType) -> Vec<Job> {
        self.filtered(|j| j.job_type == job_type)
    }

    pub fn get_by_item_id_and_type(&self, item_id: ItemId, job_type: JobType) -> Vec<Job> {
        self.filtered(|j| j.item_id == item_id && j.job_type == job_type)
    }

    fn filtered(&self, predicate: impl Fn(&Job) -> bool) -> Vec<Job> {
        read_guard(&self.cache)
            .jobs
            .iter()
            .filter(|j| predicate(j))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryRowStore;
    use serde_json::{json, Map};

    pub(crate) fn new_job(item_id: ItemId, job_type: JobType) -> NewJob {
        NewJob {
            job_type,
            item_id,
            original_image: None,
            prompt: format!("{job_type} for {item_id}"),
            submit_date: None,
            submitee: "admin".into(),
            meta: Map::new(),
        }
    }

    fn job_row(id: i64, item_id: i64, job_type: &str) -> serde_json::Value {
        json!({
            "id": id,
            "type": job_type,
            "itemId": item_id,
            "prompt": "p",
            "submitDate": "2025-01-01T10:00:00Z",
            "createDate": "2025-01-01T10:00:00Z",
            "submitee": "user1",
            "meta": {}
        })
    }

    fn store(policy: CachePolicy) -> (Arc<MemoryRowStore>, JobStore) {
        let backend = Arc::new(MemoryRowStore::new());
        let jobs = JobStore::new(backend.clone(), policy);
        (backend, jobs)
    }

    #[tokio::test]
    async fn test_cache_once_skips_fetch_when_loaded() {
        let (backend, jobs) = store(CachePolicy::Once);
        backend.seed(Table::Jobs, vec![job_row(1, 5, "photo")]);
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Refreshed(1));

        backend.seed(Table::Jobs, vec![job_row(2, 5, "video")]);
        let before = jobs.all();
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Cached(1));
        assert_eq!(jobs.all(), before);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (backend, jobs) = store(CachePolicy::Once);
        backend.seed(Table::Jobs, vec![job_row(1, 5, "photo")]);
        jobs.fetch_all().await.unwrap();
        backend.seed(Table::Jobs, vec![job_row(2, 5, "video")]);

        jobs.invalidate();
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Refreshed(2));
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Cached(2));
    }

    #[tokio::test]
    async fn test_always_policy_refetches() {
        let (backend, jobs) = store(CachePolicy::Always);
        backend.seed(Table::Jobs, vec![job_row(1, 5, "photo")]);
        jobs.fetch_all().await.unwrap();
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Refreshed(1));
    }

    #[tokio::test]
    async fn test_ttl_policy_expires() {
        let (backend, jobs) = store(CachePolicy::Ttl(Duration::from_millis(20)));
        backend.seed(Table::Jobs, vec![job_row(1, 5, "photo")]);
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Refreshed(1));
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Cached(1));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Refreshed(1));
    }

    #[tokio::test]
    async fn test_add_stamps_id_and_creation_time() {
        let (backend, jobs) = store(CachePolicy::Once);
        let job = jobs.add(new_job(5, JobType::Story)).await.unwrap();
        assert!(job.id > 0);
        assert!(job.create_date.is_some());
        assert_eq!(job.submit_date, job.create_date);
        assert_eq!(backend.rows(Table::Jobs)[0]["type"], "story");
        assert_eq!(jobs.get_by_id(job.id), Some(job));
    }

    #[tokio::test]
    async fn test_item_and_type_lookup_is_conjunctive() {
        let (_, jobs) = store(CachePolicy::Once);
        let both = jobs.add(new_job(5, JobType::Photo)).await.unwrap();
        jobs.add(new_job(5, JobType::Video)).await.unwrap();
        jobs.add(new_job(6, JobType::Photo)).await.unwrap();

        let matched = jobs.get_by_item_id_and_type(5, JobType::Photo);
        assert_eq!(matched, vec![both]);
        assert_eq!(jobs.get_by_item_id(5).len(), 2);
        assert_eq!(jobs.get_by_type(JobType::Photo).len(), 2);
    }

    #[tokio::test]
    async fn test_update_attaches_result_url() {
        let (_, jobs) = store(CachePolicy::Once);
        let job = jobs.add(new_job(5, JobType::Photo)).await.unwrap();
        let updated = jobs
            .update(
                job.id,
                JobPatch {
                    url: Some("https://cdn.example/out.jpg".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.has_result());
        assert!(jobs.update(1, JobPatch::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_job() {
        let (_, jobs) = store(CachePolicy::Once);
        let job = jobs.add(new_job(5, JobType::Photo)).await.unwrap();
        assert!(jobs.delete(job.id).await.unwrap());
        assert!(jobs.all().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_skips_remote_call() {
        let (backend, jobs) = store(CachePolicy::Once);
        jobs.add(new_job(5, JobType::Photo)).await.unwrap();
        let writes = backend.write_count();

        assert!(!jobs.delete(404).await.unwrap());
        assert_eq!(backend.write_count(), writes);
        assert_eq!(jobs.all().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_keeps_rows_with_null_columns() {
        let (backend, jobs) = store(CachePolicy::Once);
        backend.seed(
            Table::Jobs,
            vec![
                job_row(1, 5, "photo"),
                json!({
                    "id": 2,
                    "type": "video",
                    "itemId": 5,
                    "prompt": null,
                    "submitee": null,
                    "submitDate": null,
                    "createDate": null,
                    "url": null
                }),
                json!({ "id": 3, "type": "story", "itemId": null, "prompt": "p" }),
            ],
        );
        assert_eq!(jobs.fetch_all().await.unwrap(), FetchOutcome::Refreshed(3));
        assert_eq!(jobs.get_by_item_id(5).len(), 2);
        assert_eq!(jobs.get_by_id(2).unwrap().submit_date, None);
    }

    #[test]
    fn test_cache_policy_parsing() {
        assert_eq!("once".parse::<CachePolicy>().unwrap(), CachePolicy::Once);
        assert_eq!("ALWAYS".parse::<CachePolicy>().unwrap(), CachePolicy::Always);
        assert_eq!(
            "ttl:60".parse::<CachePolicy>().unwrap(),
            CachePolicy::Ttl(Duration::from_secs(60))
        );
        assert!("ttl:soon".parse::<CachePolicy>().is_err());
    }
}
