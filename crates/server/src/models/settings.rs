use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest duplicate-title window accepted from the settings file.
pub const MAX_DEDUP_WINDOW_DAYS: u32 = 3650;

/// Pipeline tuning stored in `settings.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub fanout: FanoutSettings,
    #[serde(default)]
    pub matcher: MatcherSettings,
    #[serde(default)]
    pub push: PushSettings,
}

impl Settings {
    /// Clamp values that would stall or spin the pipeline.
    pub fn normalized(mut self) -> Self {
        self.ingestion.interval_secs = self.ingestion.interval_secs.max(1);
        self.ingestion.dedup_window_days = self
            .ingestion
            .dedup_window_days
            .clamp(1, MAX_DEDUP_WINDOW_DAYS);
        self.ingestion.fetch_timeout_secs = self.ingestion.fetch_timeout_secs.max(1);
        self.fanout.interval_secs = self.fanout.interval_secs.max(1);
        self.fanout.article_page_size = self.fanout.article_page_size.max(1);
        self.fanout.recipient_page_size = self.fanout.recipient_page_size.max(1);
        self.matcher.search_limit = self.matcher.search_limit.max(1);
        self.matcher.index_page_size = self.matcher.index_page_size.max(1);
        self.push.timeout_secs = self.push.timeout_secs.max(1);
        self
    }
}

/// Feed polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Seconds between two polls (one feed source per poll)
    #[serde(default = "IngestionSettings::default_interval_secs")]
    pub interval_secs: u64,
    /// Same-title articles within this many days are duplicates
    #[serde(default = "IngestionSettings::default_dedup_window_days")]
    pub dedup_window_days: u32,
    #[serde(default = "IngestionSettings::default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Alternate between built-in and user-added sources
    #[serde(default = "IngestionSettings::default_partition_by_origin")]
    pub partition_by_origin: bool,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            dedup_window_days: Self::default_dedup_window_days(),
            fetch_timeout_secs: Self::default_fetch_timeout_secs(),
            partition_by_origin: Self::default_partition_by_origin(),
        }
    }
}

impl IngestionSettings {
    fn default_interval_secs() -> u64 {
        300
    }

    fn default_dedup_window_days() -> u32 {
        30
    }

    fn default_fetch_timeout_secs() -> u64 {
        30
    }

    fn default_partition_by_origin() -> bool {
        true
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// How fan-out addresses recipients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One send per eligible user, resolved from the database
    #[default]
    Users,
    /// One send per topic chunk; the gateway resolves subscribers.
    ///
    /// Entitlement is enforced when topics are assigned: a user whose
    /// entitlement lapses keeps receiving topic sends until
    /// `SubscriptionService::sync_user_topics` runs for them again.
    Topics,
}

/// Notification fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutSettings {
    #[serde(default = "FanoutSettings::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "FanoutSettings::default_article_page_size")]
    pub article_page_size: u32,
    #[serde(default = "FanoutSettings::default_recipient_page_size")]
    pub recipient_page_size: u32,
    /// Upper bound of the per-article pause (one second per topic)
    #[serde(default = "FanoutSettings::default_max_pacing_secs")]
    pub max_pacing_secs: u64,
    #[serde(default)]
    pub dispatch_mode: DispatchMode,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            article_page_size: Self::default_article_page_size(),
            recipient_page_size: Self::default_recipient_page_size(),
            max_pacing_secs: Self::default_max_pacing_secs(),
            dispatch_mode: DispatchMode::default(),
        }
    }
}

impl FanoutSettings {
    fn default_interval_secs() -> u64 {
        30
    }

    fn default_article_page_size() -> u32 {
        100
    }

    fn default_recipient_page_size() -> u32 {
        500
    }

    fn default_max_pacing_secs() -> u64 {
        5
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherSettings {
    /// Max candidates returned by the description search
    #[serde(default = "MatcherSettings::default_search_limit")]
    pub search_limit: u32,
    /// Rows per page when loading the symbol index
    #[serde(default = "MatcherSettings::default_index_page_size")]
    pub index_page_size: u32,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            search_limit: Self::default_search_limit(),
            index_page_size: Self::default_index_page_size(),
        }
    }
}

impl MatcherSettings {
    fn default_search_limit() -> u32 {
        32
    }

    fn default_index_page_size() -> u32 {
        1000
    }
}

/// Push relay connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSettings {
    /// Relay base URL; empty logs notifications instead of sending them
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    /// Prepended to every topic (e.g. `staging_`)
    #[serde(default)]
    pub topic_prefix: String,
    #[serde(default = "PushSettings::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            topic_prefix: String::new(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

impl PushSettings {
    fn default_timeout_secs() -> u64 {
        10
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
