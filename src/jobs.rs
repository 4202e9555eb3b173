//! Background ingestion jobs.
//!
//! The ingestion pipeline blocks, so each job runs to completion on a
//! dedicated worker thread while the registry tracks its lifecycle for
//! status polling. The registry is in-process; job handles do not survive
//! a restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::ingest::{ingest_session, IngestReport};
use crate::provider::SessionProvider;
use crate::storage::Repository;

/// Lifecycle of one ingestion job.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Queued,
    Started,
    Finished(IngestReport),
    Failed(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Finished(_) => "finished",
            JobStatus::Failed(_) => "failed",
        }
    }
}

/// Shared registry of ingestion jobs.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<Mutex<HashMap<Uuid, JobStatus>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit an ingestion job, returning its handle immediately.
    pub async fn submit<P>(
        &self,
        provider: Arc<P>,
        db_path: PathBuf,
        year: i32,
        round: i32,
        code: String,
    ) -> Uuid
    where
        P: SessionProvider + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.set(id, JobStatus::Queued).await;

        let registry = self.clone();
        tokio::spawn(async move {
            registry.set(id, JobStatus::Started).await;

            let result = tokio::task::spawn_blocking(move || -> anyhow::Result<IngestReport> {
                let mut repo = Repository::open(&db_path)?;
                ingest_session(provider.as_ref(), &mut repo, year, round, &code)
            })
            .await;

            let status = match result {
                Ok(Ok(report)) => JobStatus::Finished(report),
                Ok(Err(e)) => JobStatus::Failed(format!("{:#}", e)),
                Err(e) => JobStatus::Failed(format!("Ingestion task panicked: {}", e)),
            };
            registry.set(id, status).await;
        });

        id
    }

    /// Current status of a job, if known.
    pub async fn status(&self, id: &Uuid) -> Option<JobStatus> {
        self.jobs.lock().await.get(id).cloned()
    }

    async fn set(&self, id: Uuid, status: JobStatus) {
        self.jobs.lock().await.insert(id, status);
    }
}
