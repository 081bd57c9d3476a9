mod news_ingest_job;
mod news_notify_job;
mod traits;

pub use news_ingest_job::NewsIngestJob;
pub use news_notify_job::NewsNotifyJob;
pub use traits::{JobResult, SchedulerJob};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job is already running: {0}")]
    JobAlreadyRunning(String),
}

/// Status of a registered job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobStatus {
    pub name: &'static str,
    pub interval_secs: u64,
    pub is_running: bool,
}

/// Runtime state of a single job, shared by its timer and manual triggers
struct JobEntry {
    job: Arc<dyn SchedulerJob>,
    is_running: AtomicBool,
}

/// Holds a job's running flag; clears it when dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Scheduler service that manages periodic background tasks.
///
/// Each job runs in its own tokio task at its own interval. A job is never
/// executed twice at the same time: a tick or trigger that arrives while it
/// is running is skipped, not queued.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = SchedulerService::new()
///     .with_job(NewsIngestJob::new(ingestion, Duration::from_secs(300)))
///     .with_job(NewsNotifyJob::new(fanout, Duration::from_secs(30)));
///
/// scheduler.start();
/// ```
pub struct SchedulerService {
    jobs: Vec<Arc<JobEntry>>,
    shutdown: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SchedulerService {
    /// Creates a new scheduler service with no jobs.
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Adds a job to the scheduler.
    ///
    /// Jobs are not started until [`start`](Self::start) is called.
    pub fn with_job<J: SchedulerJob + 'static>(mut self, job: J) -> Self {
        self.jobs.push(Arc::new(JobEntry {
            job: Arc::new(job),
            is_running: AtomicBool::new(false),
        }));
        self
    }

    /// Starts all registered jobs. The first run of each job happens immediately.
    pub fn start(&self) {
        let mut handles = match self.handles.lock() {
            Ok(handles) => handles,
            Err(poisoned) => poisoned.into_inner(),
        };

        for entry in &self.jobs {
            let entry = Arc::clone(entry);
            let shutdown = self.shutdown.subscribe();
            handles.push(tokio::spawn(Self::run_job_loop(entry, shutdown)));
        }

        tracing::info!("Scheduler started with {} jobs", self.jobs.len());
    }

    async fn run_job_loop(entry: Arc<JobEntry>, mut shutdown: watch::Receiver<bool>) {
        let name = entry.job.name();
        let mut timer = tokio::time::interval(entry.job.interval());
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if !Self::execute(&entry).await {
                        tracing::debug!("Job '{}' is already running, skipping this tick", name);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        tracing::debug!("Job '{}' loop stopped", name);
    }

    /// Run the job unless it is already running. Returns whether it ran.
    ///
    /// The execution runs in its own task, so a panic is reported as a
    /// failure and the job stays schedulable.
    async fn execute(entry: &JobEntry) -> bool {
        let Some(_guard) = RunningGuard::acquire(&entry.is_running) else {
            return false;
        };

        let job = Arc::clone(&entry.job);
        let name = job.name();

        match tokio::spawn(async move { job.execute().await }).await {
            Ok(Ok(())) => tracing::debug!("Job '{}' completed successfully", name),
            Ok(Err(e)) => tracing::error!("Job '{}' failed: {}", name, e),
            Err(e) if e.is_panic() => tracing::error!("Job '{}' panicked", name),
            Err(e) => tracing::error!("Job '{}' was cancelled: {}", name, e),
        }
        true
    }

    /// Run a job now, outside its schedule, and wait for it to finish.
    pub async fn trigger(&self, job_name: &str) -> Result<(), SchedulerError> {
        let entry = self
            .jobs
            .iter()
            .find(|entry| entry.job.name() == job_name)
            .ok_or_else(|| SchedulerError::JobNotFound(job_name.to_string()))?;

        tracing::info!("Manually triggering job '{}'", job_name);
        if Self::execute(entry).await {
            Ok(())
        } else {
            Err(SchedulerError::JobAlreadyRunning(job_name.to_string()))
        }
    }

    pub fn list_jobs(&self) -> Vec<JobStatus> {
        self.jobs
            .iter()
            .map(|entry| JobStatus {
                name: entry.job.name(),
                interval_secs: entry.job.interval().as_secs(),
                is_running: entry.is_running.load(Ordering::Acquire),
            })
            .collect()
    }

    /// Stop all job loops. A job that is mid-execution finishes first.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let handles: Vec<_> = match self.handles.lock() {
            Ok(mut handles) => handles.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler task ended abnormally: {}", e);
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Returns the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

impl Default for SchedulerService {
    fn default() -> Self {
        Self::new()
    }
}
