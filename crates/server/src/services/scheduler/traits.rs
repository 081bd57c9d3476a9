use async_trait::async_trait;
use std::time::Duration;

/// Outcome of one job execution. Errors are logged by the scheduler.
pub type JobResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A periodic background task.
#[async_trait]
pub trait SchedulerJob: Send + Sync {
    /// Unique name, also used for manual triggering.
    fn name(&self) -> &'static str;

    /// Time between two timer-driven executions.
    fn interval(&self) -> Duration;

    async fn execute(&self) -> JobResult;
}
