use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use push::{topic_for, PushGateway, PushMessage, TopicDispatcher, MAX_CONDITION_TOPICS};
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{DispatchMode, FanoutSettings, FeedSource, PendingArticle};
use crate::repositories::{ArticleRepository, SubscriptionRepository};
use crate::services::SettingsService;

/// Resolves which users should be notified about an article.
#[async_trait]
pub trait SubscriptionResolver: Send + Sync {
    /// Next page of eligible user ids after `after_user_id`, ascending.
    async fn recipients_page(
        &self,
        article_id: i64,
        feed_source_id: i64,
        after_user_id: Option<i64>,
        limit: u32,
    ) -> anyhow::Result<Vec<i64>>;
}

/// Resolver over the watchlist, feed subscription and entitlement tables.
pub struct SqliteSubscriptionResolver {
    db: SqlitePool,
}

impl SqliteSubscriptionResolver {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionResolver for SqliteSubscriptionResolver {
    async fn recipients_page(
        &self,
        article_id: i64,
        feed_source_id: i64,
        after_user_id: Option<i64>,
        limit: u32,
    ) -> anyhow::Result<Vec<i64>> {
        let page = SubscriptionRepository::eligible_recipients_page(
            &self.db,
            article_id,
            feed_source_id,
            after_user_id,
            limit,
            Utc::now(),
        )
        .await?;
        Ok(page)
    }
}

/// Counters for one fan-out run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutSummary {
    /// Articles marked as sent
    pub articles: usize,
    /// Articles without a feed source (marked sent, nothing dispatched)
    pub orphaned: usize,
    /// Gateway calls issued
    pub attempts: usize,
    /// Calls that failed, timed out or reached no device
    pub failures: usize,
}

/// Clears the in-progress flag when a run ends, including on early return.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends push notifications for stored articles, oldest publication first,
/// and marks each article once its recipients have been processed.
pub struct FanoutService {
    db: SqlitePool,
    gateway: Arc<dyn PushGateway>,
    resolver: Arc<dyn SubscriptionResolver>,
    settings: Arc<SettingsService>,
    is_processing: AtomicBool,
}

impl FanoutService {
    pub fn new(
        db: SqlitePool,
        gateway: Arc<dyn PushGateway>,
        resolver: Arc<dyn SubscriptionResolver>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            db,
            gateway,
            resolver,
            settings,
            is_processing: AtomicBool::new(false),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::Acquire)
    }

    /// Work through every pending article.
    ///
    /// Returns `None` without doing anything when a run is already active.
    /// Dispatch failures are counted, never returned; database failures
    /// end the run and leave the current article pending.
    pub async fn process_pending_articles(&self) -> AppResult<Option<FanoutSummary>> {
        let Some(_guard) = ProcessingGuard::acquire(&self.is_processing) else {
            tracing::info!("Fan-out already running, skipping this trigger");
            return Ok(None);
        };

        let settings = self.settings.get();
        let fanout = settings.fanout;
        let push_timeout = settings.push.timeout();
        let dispatcher = TopicDispatcher::new(Arc::clone(&self.gateway), settings.push.topic_prefix);
        let page_size = fanout.article_page_size.max(1);

        let mut summary = FanoutSummary::default();

        loop {
            // One extra row tells whether another page follows
            let mut page = ArticleRepository::pending_page(&self.db, page_size + 1).await?;
            let has_more = page.len() > page_size as usize;
            page.truncate(page_size as usize);

            let count = page.len();
            for (i, pending) in page.into_iter().enumerate() {
                let topic_count = self
                    .process_article(&pending, &fanout, &dispatcher, push_timeout, &mut summary)
                    .await?;

                let is_last = !has_more && i + 1 == count;
                if !is_last {
                    pace(topic_count, fanout.max_pacing_secs).await;
                }
            }

            if !has_more {
                break;
            }
        }

        if summary.articles > 0 {
            tracing::info!(
                "Fan-out finished: {} articles, {} gateway calls, {} failures",
                summary.articles,
                summary.attempts,
                summary.failures
            );
        }
        Ok(Some(summary))
    }

    /// Dispatch one article and mark it sent. Returns the number of
    /// distinct topics it maps to, which drives pacing.
    async fn process_article(
        &self,
        pending: &PendingArticle,
        fanout: &FanoutSettings,
        dispatcher: &TopicDispatcher,
        push_timeout: Duration,
        summary: &mut FanoutSummary,
    ) -> AppResult<usize> {
        let article = &pending.article;

        let Some(source) = pending.feed_source.as_ref() else {
            tracing::error!("Article {} has no feed source, skipping dispatch", article.id);
            ArticleRepository::mark_notifications_sent(&self.db, article.id).await?;
            summary.orphaned += 1;
            return Ok(0);
        };

        let topics: Vec<String> = pending
            .symbols
            .iter()
            .filter_map(|symbol| match topic_for(symbol, source.id) {
                Ok(topic) => Some(topic),
                Err(e) => {
                    tracing::warn!("Article {}: {}", article.id, e);
                    None
                }
            })
            .collect();

        let message = notification_for(pending, source);

        match fanout.dispatch_mode {
            DispatchMode::Users => {
                self.notify_recipients(pending, source, &message, fanout, push_timeout, summary)
                    .await?;
            }
            DispatchMode::Topics => {
                let chunks = topics.len().div_ceil(MAX_CONDITION_TOPICS).max(1) as u32;
                match tokio::time::timeout(
                    push_timeout.saturating_mul(chunks),
                    dispatcher.send_to_topics(&topics, &message),
                )
                .await
                {
                    Ok(sent) => {
                        summary.attempts += sent.calls;
                        summary.failures += sent.failures;
                    }
                    Err(_) => {
                        tracing::warn!("Topic dispatch for article {} timed out", article.id);
                        summary.failures += 1;
                    }
                }
            }
        }

        ArticleRepository::mark_notifications_sent(&self.db, article.id).await?;
        summary.articles += 1;
        tracing::debug!("Article {} notified ({} topics)", article.id, topics.len());

        Ok(topics.len())
    }

    /// Page through eligible users; each page is dispatched concurrently.
    async fn notify_recipients(
        &self,
        pending: &PendingArticle,
        source: &FeedSource,
        message: &PushMessage,
        fanout: &FanoutSettings,
        push_timeout: Duration,
        summary: &mut FanoutSummary,
    ) -> AppResult<()> {
        let limit = fanout.recipient_page_size.max(1);
        let mut after: Option<i64> = None;

        loop {
            let recipients = self
                .resolver
                .recipients_page(pending.article.id, source.id, after, limit)
                .await
                .map_err(|e| AppError::internal(format!("recipient lookup failed: {}", e)))?;

            let results = join_all(
                recipients
                    .iter()
                    .map(|&user_id| self.send_to_user(user_id, message, push_timeout)),
            )
            .await;

            summary.attempts += results.len();
            summary.failures += results.iter().filter(|delivered| !**delivered).count();

            if recipients.len() < limit as usize {
                break;
            }
            after = recipients.last().copied();
        }

        Ok(())
    }

    /// Returns whether the gateway reported delivery to at least one device.
    async fn send_to_user(&self, user_id: i64, message: &PushMessage, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.gateway.send_to_user(user_id, message)).await {
            Ok(Ok(report)) => {
                if report.sent_with_errors {
                    tracing::debug!("Push to user {} failed on some devices", user_id);
                }
                report.sent
            }
            Ok(Err(e)) => {
                tracing::warn!("Push to user {} failed: {}", user_id, e);
                false
            }
            Err(_) => {
                tracing::warn!("Push to user {} timed out after {:?}", user_id, timeout);
                false
            }
        }
    }
}

/// Title is the headline; body lists the matched symbols and the source.
fn notification_for(pending: &PendingArticle, source: &FeedSource) -> PushMessage {
    let article = &pending.article;
    let body = format!("{} · {}", pending.symbols.join(", "), source.title);

    PushMessage::new(article.title.clone(), body)
        .with_data("type", "news")
        .with_data("articleId", article.id.to_string())
        .with_data("feedSourceId", source.id.to_string())
        .with_collapse_key(format!("news-{}", article.id))
}

/// One second per topic just used, capped at `max_secs`.
fn pacing_delay(topic_count: usize, max_secs: u64) -> Duration {
    Duration::from_secs((topic_count as u64).min(max_secs))
}

async fn pace(topic_count: usize, max_secs: u64) {
    let delay = pacing_delay(topic_count, max_secs);
    if !delay.is_zero() {
        tracing::debug!("Pacing fan-out for {:?}", delay);
        tokio::time::sleep(delay).await;
    }
}
