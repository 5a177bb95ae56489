//! Job queue contract and its implementations.
//!
//! The queue collaborator's delivery, visibility and TTL semantics are an
//! explicit interface here: enqueue with a policy, claim for execution,
//! publish a terminal result, fetch by id, delete. `RedisJobStore` backs
//! production; `InMemoryJobStore` has the same observable semantics
//! (minus expiry) and backs deterministic tests and local development.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{JobRecord, QueueState, VerificationResult};

const PENDING_KEY: &str = "archive_verify:pending";
const PROCESSING_KEY: &str = "archive_verify:processing";

fn job_key(job_id: Uuid) -> String {
    format!("archive_verify:job:{job_id}")
}

/// Retention knobs applied when a job enters the queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueuePolicy {
    /// Hard cap on workflow execution time.
    pub job_timeout_secs: u64,
    /// How long a terminal result stays readable.
    pub result_ttl_secs: u64,
    /// How long job metadata lives before expiring.
    pub job_ttl_secs: u64,
}

impl QueuePolicy {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("malformed job id in queue: {0}")]
    MalformedId(String),

    #[error("no such job {0}")]
    UnknownJob(Uuid),
}

/// Contract the service holds the queue collaborator to.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new pending job and make it claimable.
    async fn enqueue(&self, record: &JobRecord, policy: &QueuePolicy) -> Result<(), QueueError>;

    /// Claim the next pending job for execution, moving it to `Started`.
    /// At most one claimant ever receives a given job.
    async fn claim_next(&self) -> Result<Option<JobRecord>, QueueError>;

    /// Publish the workflow result for a claimed job, moving it to
    /// `Finished` and starting the result-retention clock.
    async fn store_result(
        &self,
        job_id: Uuid,
        result: VerificationResult,
    ) -> Result<(), QueueError>;

    /// Record a worker fault (crash or timeout), moving the job to `Failed`.
    async fn store_fault(&self, job_id: Uuid, fault: String) -> Result<(), QueueError>;

    /// Point-in-time read of a job record.
    async fn fetch(&self, job_id: Uuid) -> Result<Option<JobRecord>, QueueError>;

    /// Drop a job record entirely.
    async fn delete(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// Number of jobs waiting to be claimed.
    async fn depth(&self) -> Result<u64, QueueError>;

    /// Connectivity check for health reporting.
    async fn ping(&self) -> Result<(), QueueError>;
}

/// Envelope stored per job: the record plus the policy that governs its
/// retention, so terminal writes know which TTL to apply.
#[derive(Debug, Serialize, Deserialize)]
struct StoredJob {
    record: JobRecord,
    policy: QueuePolicy,
}

/// Redis-backed job store. Records are JSON values under per-job keys
/// with TTLs; pending job ids feed workers through a list, and claimed
/// ids are parked on a processing list so each claim is handed out once.
pub struct RedisJobStore {
    client: redis::Client,
}

impl RedisJobStore {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn load(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: Uuid,
    ) -> Result<Option<StoredJob>, QueueError> {
        let payload: Option<String> = conn.get(job_key(job_id)).await?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        stored: &StoredJob,
        ttl_secs: u64,
    ) -> Result<(), QueueError> {
        let payload = serde_json::to_string(stored)?;
        conn.set_ex::<_, _, ()>(job_key(stored.record.job_id), payload, ttl_secs)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn enqueue(&self, record: &JobRecord, policy: &QueuePolicy) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let stored = StoredJob {
            record: record.clone(),
            policy: *policy,
        };
        self.save(&mut conn, &stored, policy.job_ttl_secs).await?;
        conn.lpush::<_, _, ()>(PENDING_KEY, record.job_id.to_string())
            .await?;
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<JobRecord>, QueueError> {
        let mut conn = self.conn().await?;
        let claimed: Option<String> = conn.rpoplpush(PENDING_KEY, PROCESSING_KEY).await?;
        let Some(id) = claimed else {
            return Ok(None);
        };
        let job_id = Uuid::parse_str(&id).map_err(|_| QueueError::MalformedId(id.clone()))?;

        let Some(mut stored) = self.load(&mut conn, job_id).await? else {
            // Metadata expired while the id sat in the queue.
            conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &id).await?;
            return Ok(None);
        };

        stored.record.state = QueueState::Started;
        let ttl = stored.policy.job_ttl_secs;
        self.save(&mut conn, &stored, ttl).await?;
        Ok(Some(stored.record))
    }

    async fn store_result(
        &self,
        job_id: Uuid,
        result: VerificationResult,
    ) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let Some(mut stored) = self.load(&mut conn, job_id).await? else {
            return Err(QueueError::UnknownJob(job_id));
        };
        stored.record.state = QueueState::Finished;
        stored.record.result = Some(result);
        let ttl = stored.policy.result_ttl_secs;
        self.save(&mut conn, &stored, ttl).await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, job_id.to_string())
            .await?;
        Ok(())
    }

    async fn store_fault(&self, job_id: Uuid, fault: String) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        let Some(mut stored) = self.load(&mut conn, job_id).await? else {
            return Err(QueueError::UnknownJob(job_id));
        };
        stored.record.state = QueueState::Failed;
        stored.record.fault = Some(fault);
        let ttl = stored.policy.result_ttl_secs;
        self.save(&mut conn, &stored, ttl).await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, job_id.to_string())
            .await?;
        Ok(())
    }

    async fn fetch(&self, job_id: Uuid) -> Result<Option<JobRecord>, QueueError> {
        let mut conn = self.conn().await?;
        Ok(self.load(&mut conn, job_id).await?.map(|s| s.record))
    }

    async fn delete(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(job_key(job_id)).await?;
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn().await?;
        let depth: u64 = conn.llen(PENDING_KEY).await?;
        Ok(depth)
    }

    async fn ping(&self) -> Result<(), QueueError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryState {
    jobs: HashMap<Uuid, JobRecord>,
    pending: VecDeque<Uuid>,
}

/// In-memory job store. Same observable semantics as the Redis store,
/// minus expiry.
#[derive(Default)]
pub struct InMemoryJobStore {
    inner: Mutex<InMemoryState>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, record: &JobRecord, _policy: &QueuePolicy) -> Result<(), QueueError> {
        let mut state = self.inner.lock().unwrap();
        state.jobs.insert(record.job_id, record.clone());
        state.pending.push_back(record.job_id);
        Ok(())
    }

    async fn claim_next(&self) -> Result<Option<JobRecord>, QueueError> {
        let mut state = self.inner.lock().unwrap();
        let Some(job_id) = state.pending.pop_front() else {
            return Ok(None);
        };
        match state.jobs.get_mut(&job_id) {
            Some(record) => {
                record.state = QueueState::Started;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn store_result(
        &self,
        job_id: Uuid,
        result: VerificationResult,
    ) -> Result<(), QueueError> {
        let mut state = self.inner.lock().unwrap();
        let record = state
            .jobs
            .get_mut(&job_id)
            .ok_or(QueueError::UnknownJob(job_id))?;
        record.state = QueueState::Finished;
        record.result = Some(result);
        Ok(())
    }

    async fn store_fault(&self, job_id: Uuid, fault: String) -> Result<(), QueueError> {
        let mut state = self.inner.lock().unwrap();
        let record = state
            .jobs
            .get_mut(&job_id)
            .ok_or(QueueError::UnknownJob(job_id))?;
        record.state = QueueState::Failed;
        record.fault = Some(fault);
        Ok(())
    }

    async fn fetch(&self, job_id: Uuid) -> Result<Option<JobRecord>, QueueError> {
        let state = self.inner.lock().unwrap();
        Ok(state.jobs.get(&job_id).cloned())
    }

    async fn delete(&self, job_id: Uuid) -> Result<(), QueueError> {
        let mut state = self.inner.lock().unwrap();
        state.jobs.remove(&job_id);
        Ok(())
    }

    async fn depth(&self) -> Result<u64, QueueError> {
        let state = self.inner.lock().unwrap();
        Ok(state.pending.len() as u64)
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
