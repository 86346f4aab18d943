//! Virtual try-on orchestration.
//!
//! A try-on uploads the customer's photo and the garment photo, starts a
//! remote generation job with their public URLs, then polls the job on a
//! fixed interval until it reaches a terminal status or the deadline
//! passes. [`TryOnTracker`] runs that poll loop in the background and keeps
//! the mirrored state each customer reads back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::tryon::{JobStatus, TryOnJob, TryOnRequest, TryOnState};
use crate::routes::metrics as metric_names;
use crate::services::generation::{GenerationApi, GenerationError, GenerationInput};
use crate::services::storage::{ObjectStore, StorageError};

const UPLOAD_PREFIX: &str = "try-on-images";

/// How long finished try-ons stay queryable.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(10 * 60);

/// Timing of the status poll loop. Both durations are non-zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    interval: Duration,
    timeout: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, InvalidPollSettings> {
        if interval.is_zero() {
            return Err(InvalidPollSettings::ZeroInterval);
        }
        if timeout.is_zero() {
            return Err(InvalidPollSettings::ZeroTimeout);
        }
        Ok(Self { interval, timeout })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InvalidPollSettings {
    #[error("Try-on poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Try-on timeout must be greater than zero")]
    ZeroTimeout,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    #[error("Failed to upload image: {0}")]
    Upload(#[source] StorageError),

    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(#[source] GenerationError),

    #[error("Try-on generation failed")]
    GenerationFailed(Option<String>),

    #[error("Try-on generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Try-on cancelled")]
    Cancelled,
}

impl TryOnError {
    /// Stable code reported with a failed try-on.
    pub fn code(&self) -> &'static str {
        match self {
            TryOnError::Upload(_) => "upload_failed",
            TryOnError::ServiceUnavailable(_) => "service_unavailable",
            TryOnError::GenerationFailed(_) => "generation_failed",
            TryOnError::Timeout(_) => "timeout",
            TryOnError::Cancelled => "cancelled",
        }
    }

    /// Message shown to the customer.
    pub fn user_message(&self) -> String {
        match self {
            TryOnError::Upload(_) => "Failed to upload image".to_string(),
            TryOnError::ServiceUnavailable(GenerationError::NotConfigured) => {
                "AI service not configured".to_string()
            }
            TryOnError::ServiceUnavailable(_) => "AI service is unavailable".to_string(),
            TryOnError::GenerationFailed(Some(detail)) => {
                format!("Try-on generation failed: {detail}")
            }
            TryOnError::GenerationFailed(None) => "Try-on generation failed".to_string(),
            TryOnError::Timeout(_) => "Try-on generation timed out".to_string(),
            TryOnError::Cancelled => "Try-on cancelled".to_string(),
        }
    }
}

/// Uploads, job creation and status polling for a single try-on.
pub struct TryOnService {
    storage: Arc<dyn ObjectStore>,
    generator: Arc<dyn GenerationApi>,
    settings: PollSettings,
}

impl TryOnService {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        generator: Arc<dyn GenerationApi>,
        settings: PollSettings,
    ) -> Self {
        Self {
            storage,
            generator,
            settings,
        }
    }

    /// Upload both images and start the generation job.
    ///
    /// The subject photo is uploaded first; if either upload fails no job
    /// is started.
    pub async fn submit(&self, request: &TryOnRequest) -> Result<TryOnJob, TryOnError> {
        let subject_key = upload_key(request, "subject", request.subject.extension());
        let subject_url = self
            .storage
            .upload(&subject_key, request.subject.bytes(), request.subject.mime_type())
            .await
            .map_err(TryOnError::Upload)?;

        let garment_key = upload_key(request, "garment", request.garment.extension());
        let garment_url = self
            .storage
            .upload(&garment_key, request.garment.bytes(), request.garment.mime_type())
            .await
            .map_err(TryOnError::Upload)?;

        let input = GenerationInput {
            human_img: subject_url,
            garm_img: garment_url,
            garment_des: request.garment_description.clone(),
        };

        self.generator
            .create_job(&input)
            .await
            .map_err(TryOnError::ServiceUnavailable)
    }

    /// Poll `job_id` until it succeeds, fails, the deadline passes, or
    /// `cancel` fires. `on_update` sees every status response received
    /// before the loop ends.
    ///
    /// The deadline, the cancel token and the loop share one `select!`, so
    /// a status response still in flight when the deadline passes is
    /// dropped with the loop. A tie at the deadline goes to the timeout.
    pub async fn poll<F>(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<String, TryOnError>
    where
        F: FnMut(&TryOnJob) + Send,
    {
        let deadline = Instant::now() + self.settings.timeout;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TryOnError::Cancelled),
            _ = time::sleep_until(deadline) => {
                tracing::warn!(job_id, timeout_secs = self.settings.timeout.as_secs(), "Try-on polling timed out");
                Err(TryOnError::Timeout(self.settings.timeout))
            }
            outcome = self.poll_until_terminal(job_id, &mut on_update) => outcome,
        }
    }

    async fn poll_until_terminal<F>(&self, job_id: &str, on_update: &mut F) -> Result<String, TryOnError>
    where
        F: FnMut(&TryOnJob) + Send,
    {
        let mut ticker = time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let job = self
                .generator
                .get_job(job_id)
                .await
                .map_err(TryOnError::ServiceUnavailable)?;
            on_update(&job);

            if !job.status.is_terminal() {
                continue;
            }
            if job.status == JobStatus::Failed {
                return Err(TryOnError::GenerationFailed(job.error));
            }
            match job.result_url() {
                Some(url) => return Ok(url.to_string()),
                None => tracing::debug!(job_id, "Job succeeded without output, still polling"),
            }
        }
    }
}

fn upload_key(request: &TryOnRequest, role: &str, extension: &str) -> String {
    format!(
        "{UPLOAD_PREFIX}/{}/{}-{role}.{extension}",
        request.user_id, request.id
    )
}

/// A try-on the tracker has started.
#[derive(Debug, Clone)]
pub struct TrackedTryOn {
    pub id: Uuid,
    pub job_id: String,
    pub status: JobStatus,
}

/// Snapshot of a tracked try-on.
#[derive(Debug, Clone, PartialEq)]
pub struct TryOnSnapshot {
    pub job_id: String,
    pub state: TryOnState,
}

struct TrackedJob {
    owner: Uuid,
    job_id: String,
    state: TryOnState,
    cancel: CancellationToken,
    finished_at: Option<Instant>,
}

/// Runs poll loops in the background and keeps their mirrored state.
pub struct TryOnTracker {
    service: Arc<TryOnService>,
    jobs: Mutex<HashMap<Uuid, TrackedJob>>,
    shutdown: CancellationToken,
    retention: Duration,
}

impl TryOnTracker {
    pub fn new(service: TryOnService, retention: Duration) -> Self {
        Self {
            service: Arc::new(service),
            jobs: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            retention,
        }
    }

    /// Submit a try-on and start polling it in the background.
    ///
    /// Upload and job-creation failures are returned directly; later
    /// failures land in the tracked state.
    pub async fn start(self: &Arc<Self>, request: TryOnRequest) -> Result<TrackedTryOn, TryOnError> {
        self.prune_finished();

        let job = match self.service.submit(&request).await {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "Try-on submission failed");
                return Err(e);
            }
        };

        metrics::counter!(metric_names::TRYON_SUBMITTED).increment(1);
        tracing::info!(
            request_id = %request.id,
            user_id = %request.user_id,
            job_id = %job.id,
            status = job.status.as_str(),
            "Try-on submitted"
        );

        let cancel = self.shutdown.child_token();
        self.lock_jobs().insert(
            request.id,
            TrackedJob {
                owner: request.user_id,
                job_id: job.id.clone(),
                state: TryOnState::Pending {
                    remote_status: job.status.as_str().to_string(),
                },
                cancel: cancel.clone(),
                finished_at: None,
            },
        );

        // The task holds the tracker weakly so dropping the tracker cancels it
        let tracker = Arc::downgrade(self);
        let service = Arc::clone(&self.service);
        let id = request.id;
        let job_id = job.id.clone();
        tokio::spawn(async move {
            run_poll(service, tracker, id, job_id, cancel).await;
        });

        Ok(TrackedTryOn {
            id: request.id,
            job_id: job.id,
            status: job.status,
        })
    }

    /// Current state of a try-on owned by `owner`.
    pub fn get(&self, owner: Uuid, id: Uuid) -> Option<TryOnSnapshot> {
        self.lock_jobs()
            .get(&id)
            .filter(|job| job.owner == owner)
            .map(|job| TryOnSnapshot {
                job_id: job.job_id.clone(),
                state: job.state.clone(),
            })
    }

    /// Stop polling and forget a try-on. Returns false when `owner` has no
    /// such try-on.
    pub fn cancel(&self, owner: Uuid, id: Uuid) -> bool {
        let mut jobs = self.lock_jobs();
        match jobs.get(&id) {
            Some(job) if job.owner == owner => {
                job.cancel.cancel();
                jobs.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Cancel every running poll loop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn len(&self) -> usize {
        self.lock_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, TrackedJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_status(&self, id: Uuid, status: &JobStatus) {
        if let Some(job) = self.lock_jobs().get_mut(&id) {
            if job.state.is_pending() {
                job.state = TryOnState::Pending {
                    remote_status: status.as_str().to_string(),
                };
            }
        }
    }

    /// Write the terminal state once. Entries removed by `cancel` stay gone.
    fn finish(&self, id: Uuid, state: TryOnState) -> bool {
        let mut jobs = self.lock_jobs();
        match jobs.get_mut(&id) {
            Some(job) if job.state.is_pending() => {
                job.state = state;
                job.finished_at = Some(Instant::now());
                true
            }
            _ => false,
        }
    }

    fn prune_finished(&self) {
        let retention = self.retention;
        self.lock_jobs().retain(|_, job| match job.finished_at {
            Some(at) => at.elapsed() < retention,
            None => true,
        });
    }
}

impl Drop for TryOnTracker {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_poll(
    service: Arc<TryOnService>,
    tracker: Weak<TryOnTracker>,
    id: Uuid,
    job_id: String,
    cancel: CancellationToken,
) {
    let started = Instant::now();

    let progress = tracker.clone();
    let outcome = service
        .poll(&job_id, &cancel, move |job| {
            if let Some(tracker) = progress.upgrade() {
                tracker.record_status(id, &job.status);
            }
        })
        .await;

    let state = match outcome {
        Ok(image_url) => {
            metrics::counter!(metric_names::TRYON_SUCCEEDED).increment(1);
            metrics::histogram!(metric_names::TRYON_GENERATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
            tracing::info!(request_id = %id, job_id = %job_id, "Try-on generated");
            TryOnState::Succeeded { image_url }
        }
        Err(TryOnError::Cancelled) => {
            tracing::debug!(request_id = %id, job_id = %job_id, "Try-on polling cancelled");
            return;
        }
        Err(e) => {
            if matches!(e, TryOnError::Timeout(_)) {
                metrics::counter!(metric_names::TRYON_TIMED_OUT).increment(1);
            } else {
                metrics::counter!(metric_names::TRYON_FAILED).increment(1);
            }
            tracing::warn!(request_id = %id, job_id = %job_id, error = %e, "Try-on failed");
            TryOnState::Failed {
                code: e.code(),
                message: e.user_message(),
            }
        }
    };

    if let Some(tracker) = tracker.upgrade() {
        tracker.finish(id, state);
    }
}
