//! Job orchestrator implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::fetcher::FetchStage;
use crate::job::{CreateJobRequest, Job, JobError, JobResult, JobStatus, JobStore, JobUpdate};
use crate::metrics;
use crate::queue::{AdmissionQueue, QueueStatus};
use crate::scraper::PageScraper;
use crate::staging::StagingStore;
use crate::upscaler::{UpscaleStage, UpscaleSummary};

use super::types::{OrchestratorError, RecoveryReport, RunError};

/// Failure reason stored for jobs cut off by a restart.
pub const INTERRUPTED_REASON: &str = "interrupted by service restart";

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Drives jobs through fetch and upscale and answers queries about them.
///
/// Shared as `Arc<JobOrchestrator>`: every admitted run holds a reference
/// until it finishes.
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    staging: StagingStore,
    fetch: FetchStage,
    upscale: UpscaleStage,
    queue: AdmissionQueue,
    scraper: Option<Arc<dyn PageScraper>>,
    public_url: String,
    updates: broadcast::Sender<JobUpdate>,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        store: Arc<dyn JobStore>,
        staging: StagingStore,
        fetch: FetchStage,
        upscale: UpscaleStage,
        queue: AdmissionQueue,
        public_url: impl Into<String>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            store,
            staging,
            fetch,
            upscale,
            queue,
            scraper: None,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            updates,
        }
    }

    /// Enables crawl submissions through `scraper`.
    pub fn with_scraper(mut self, scraper: Arc<dyn PageScraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    /// Persists a PENDING job and hands its run to the admission queue.
    ///
    /// Returns as soon as the job is queued.
    pub fn create_process(
        self: &Arc<Self>,
        images: Vec<String>,
        title: Option<String>,
    ) -> Result<String, OrchestratorError> {
        if images.is_empty() {
            return Err(OrchestratorError::EmptyImageList);
        }

        let job = self.store.create(CreateJobRequest { images, title })?;
        metrics::JOBS_TOTAL
            .with_label_values(&[JobStatus::Pending.as_str()])
            .inc();
        self.publish(&job.id, JobStatus::Pending);

        if let Err(e) = self.admit(&job.id) {
            // Nothing will ever run it, so don't leave it behind.
            if let Err(del_err) = self.store.delete(&job.id) {
                warn!(job_id = %job.id, error = %del_err, "Failed to remove unadmitted job");
            }
            return Err(e);
        }

        info!(job_id = %job.id, images = job.images.len(), title = %job.title, "Job created");
        Ok(job.id)
    }

    /// Scrapes `url` for images and title, then creates a job from them.
    pub async fn create_from_page(self: &Arc<Self>, url: &str) -> Result<String, OrchestratorError> {
        let scraper = self
            .scraper
            .as_ref()
            .ok_or(OrchestratorError::ScraperUnavailable)?;

        let page = scraper.scrape(url).await?;
        if page.images.is_empty() {
            warn!(url = %url, "Page yielded no images");
            return Err(OrchestratorError::EmptyImageList);
        }

        info!(url = %url, images = page.images.len(), "Creating job from page");
        self.create_process(page.images, page.title)
    }

    fn admit(self: &Arc<Self>, id: &str) -> Result<(), OrchestratorError> {
        let this = Arc::clone(self);
        let job_id = id.to_string();
        self.queue.enqueue(id, async move {
            this.run_job(&job_id).await;
        })?;
        Ok(())
    }

    /// Runs the pipeline for one job and records its terminal status.
    ///
    /// Never returns an error: failures become FAILED with a stored reason.
    pub async fn run_job(&self, id: &str) {
        let started = Instant::now();
        info!(job_id = %id, "Job started");

        match self.execute(id).await {
            Ok(summary) => {
                metrics::JOB_DURATION
                    .with_label_values(&[JobStatus::Completed.as_str()])
                    .observe(started.elapsed().as_secs_f64());
                info!(
                    job_id = %id,
                    outputs = summary.processed(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
            }
            Err(RunError::Deleted) => {
                info!(job_id = %id, "Job deleted during run, discarding its files");
                self.discard_tree(id).await;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Job failed");
                if let Err(cleanup) = self.staging.remove_input(id).await {
                    warn!(job_id = %id, error = %cleanup, "Failed to remove input directory");
                }
                self.fail(id, &e.to_string()).await;
                metrics::JOB_DURATION
                    .with_label_values(&[JobStatus::Failed.as_str()])
                    .observe(started.elapsed().as_secs_f64());
            }
        }
    }

    async fn execute(&self, id: &str) -> Result<UpscaleSummary, RunError> {
        self.transition(id, JobStatus::Running, None)?;

        let dirs = self.staging.create_job_tree(id).await?;
        let job = self.require(id)?;

        let batch = self.fetch.fetch_all(&job.images, &dirs.input).await;
        info!(
            job_id = %id,
            downloaded = batch.succeeded_count(),
            failed = batch.failed_count(),
            "Fetch stage settled"
        );
        self.require(id)?;

        let summary = self.upscale.upscale_all(&dirs.input, &dirs.output).await?;
        debug!(job_id = %id, outputs = summary.processed(), "Upscale stage finished");

        self.staging.remove_input(id).await?;
        self.transition(id, JobStatus::Completed, None)?;
        Ok(summary)
    }

    /// Marks a job FAILED, cleaning up if it was deleted meanwhile.
    async fn fail(&self, id: &str, reason: &str) {
        match self.transition(id, JobStatus::Failed, Some(reason)) {
            Ok(_) => {}
            Err(RunError::Deleted) => self.discard_tree(id).await,
            Err(e) => error!(job_id = %id, error = %e, "Failed to record job failure"),
        }
    }

    fn transition(
        &self,
        id: &str,
        status: JobStatus,
        reason: Option<&str>,
    ) -> Result<Job, RunError> {
        match self.store.update_status(id, status, reason) {
            Ok(job) => {
                metrics::JOBS_TOTAL.with_label_values(&[status.as_str()]).inc();
                self.publish(id, status);
                Ok(job)
            }
            Err(JobError::NotFound(_)) => Err(RunError::Deleted),
            Err(e) => Err(e.into()),
        }
    }

    fn require(&self, id: &str) -> Result<Job, RunError> {
        self.store.get(id)?.ok_or(RunError::Deleted)
    }

    async fn discard_tree(&self, id: &str) {
        if let Err(e) = self.staging.remove_job_tree(id).await {
            warn!(job_id = %id, error = %e, "Failed to remove job directory");
        }
    }

    fn publish(&self, id: &str, status: JobStatus) {
        // No subscribers is fine.
        let _ = self.updates.send(JobUpdate {
            id: id.to_string(),
            status,
        });
    }

    /// Current status, live `remaining` count and, once completed, the
    /// sorted artifact URLs.
    pub async fn get_result(&self, id: &str) -> Result<JobResult, OrchestratorError> {
        let job = self
            .store
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;

        let remaining = self.staging.remaining(id).await?;
        let images = if job.status == JobStatus::Completed {
            let files = self.staging.output_files(id).await?;
            Some(
                files
                    .iter()
                    .map(|file| self.artifact_url(id, file))
                    .collect(),
            )
        } else {
            None
        };

        Ok(JobResult {
            id: job.id,
            status: job.status,
            title: job.title,
            remaining,
            images,
            failure_reason: job.failure_reason,
        })
    }

    /// Public URL of one output file.
    pub fn artifact_url(&self, id: &str, file: &str) -> String {
        format!(
            "{}/api/static/{}/output/{}",
            self.public_url,
            id,
            urlencoding::encode(file)
        )
    }

    /// Removes the record and the whole job tree. Returns whether a record
    /// existed.
    pub async fn delete_process(&self, id: &str) -> Result<bool, OrchestratorError> {
        let existed = self.store.delete(id)?;
        self.staging.remove_job_tree(id).await?;
        if existed {
            info!(job_id = %id, "Job deleted");
        }
        Ok(existed)
    }

    pub fn list_all(&self) -> Result<Vec<Job>, OrchestratorError> {
        Ok(self.store.list()?)
    }

    /// Resolves an artifact on disk for a known job.
    pub async fn output_file(
        &self,
        id: &str,
        file: &str,
    ) -> Result<Option<PathBuf>, OrchestratorError> {
        if self.store.get(id)?.is_none() {
            return Ok(None);
        }
        Ok(self.staging.output_file(id, file).await?)
    }

    /// Settles jobs left over from a previous process.
    ///
    /// RUNNING jobs cannot be resumed and become FAILED. PENDING jobs are
    /// re-admitted oldest first.
    pub async fn recover(self: &Arc<Self>) -> Result<RecoveryReport, OrchestratorError> {
        let mut report = RecoveryReport::default();

        for job in self.store.list_by_status(JobStatus::Running)? {
            warn!(job_id = %job.id, "Marking interrupted job as failed");
            if let Err(e) = self.staging.remove_input(&job.id).await {
                warn!(job_id = %job.id, error = %e, "Failed to remove input directory");
            }
            match self.transition(&job.id, JobStatus::Failed, Some(INTERRUPTED_REASON)) {
                Ok(_) | Err(RunError::Deleted) => {}
                Err(RunError::Store(e)) => return Err(e.into()),
                Err(e) => warn!(job_id = %job.id, error = %e, "Failed to fail interrupted job"),
            }
            report.interrupted += 1;
        }

        for job in self.store.list_by_status(JobStatus::Pending)? {
            self.admit(&job.id)?;
            report.readmitted += 1;
        }

        if report.interrupted > 0 || report.readmitted > 0 {
            info!(
                interrupted = report.interrupted,
                readmitted = report.readmitted,
                "Recovered jobs from previous run"
            );
        }
        Ok(report)
    }

    /// Stream of every status transition.
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Stops starting new runs. Runs in progress finish on their own.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}
