mod fanout;
mod ingestion;
mod instruments;
mod scheduler;
mod settings;
mod subscriptions;

pub use fanout::{FanoutService, FanoutSummary, SqliteSubscriptionResolver, SubscriptionResolver};
pub use ingestion::{EntrySource, IngestionService, PollSummary};
pub use instruments::{load_instrument_index, SqliteDescriptionSearch};
pub use scheduler::{
    JobResult, JobStatus, NewsIngestJob, NewsNotifyJob, SchedulerError, SchedulerJob,
    SchedulerService,
};
pub use settings::{SettingsError, SettingsService, SettingsWatcher};
pub use subscriptions::{SubscriptionService, TopicSubscriptionHook};
