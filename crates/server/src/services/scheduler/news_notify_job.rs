use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{JobResult, SchedulerJob};
use crate::services::FanoutService;

/// Sends notifications for pending articles on every tick.
///
/// Overlapping runs are refused by the fan-out service itself.
pub struct NewsNotifyJob {
    fanout: Arc<FanoutService>,
    interval: Duration,
}

impl NewsNotifyJob {
    pub const NAME: &'static str = "NewsNotify";

    pub fn new(fanout: Arc<FanoutService>, interval: Duration) -> Self {
        Self { fanout, interval }
    }
}

#[async_trait]
impl SchedulerJob for NewsNotifyJob {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> JobResult {
        self.fanout.process_pending_articles().await?;
        Ok(())
    }
}
