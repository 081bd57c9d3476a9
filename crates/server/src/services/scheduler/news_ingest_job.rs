use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{JobResult, SchedulerJob};
use crate::services::IngestionService;

/// Polls the next due feed source on every tick.
pub struct NewsIngestJob {
    ingestion: Arc<IngestionService>,
    interval: Duration,
}

impl NewsIngestJob {
    pub const NAME: &'static str = "NewsIngest";

    pub fn new(ingestion: Arc<IngestionService>, interval: Duration) -> Self {
        Self {
            ingestion,
            interval,
        }
    }
}

#[async_trait]
impl SchedulerJob for NewsIngestJob {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> JobResult {
        self.ingestion.poll_oldest_due_source().await?;
        Ok(())
    }
}
