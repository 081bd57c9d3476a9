use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feed::{FeedClient, FeedEntry};
use matcher::text::decode_entities;
use matcher::TickerMatcher;
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::models::{CreateArticle, FeedSource, SourceOrigin};
use crate::repositories::{ArticleRepository, FeedSourceRepository};
use crate::services::SettingsService;

/// Retrieves the entries of a feed document.
#[async_trait]
pub trait EntrySource: Send + Sync {
    async fn fetch(&self, url: &str) -> feed::Result<Vec<FeedEntry>>;
}

#[async_trait]
impl EntrySource for FeedClient {
    async fn fetch(&self, url: &str) -> feed::Result<Vec<FeedEntry>> {
        FeedClient::fetch(self, url).await
    }
}

/// What happened to a single feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Inserted,
    Duplicate,
    Unmatched,
    Failed,
}

/// Counters for one poll of one feed source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub feed_source_id: i64,
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub unmatched: usize,
    pub failed: usize,
    /// Fetch or parse failed; the source is retried on a later poll
    pub fetch_failed: bool,
}

impl PollSummary {
    fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Inserted => self.inserted += 1,
            EntryOutcome::Duplicate => self.duplicates += 1,
            EntryOutcome::Unmatched => self.unmatched += 1,
            EntryOutcome::Failed => self.failed += 1,
        }
    }
}

/// Polls feed sources one at a time, oldest first, and stores new articles
/// that mention at least one known instrument.
pub struct IngestionService {
    db: SqlitePool,
    entries: Arc<dyn EntrySource>,
    matcher: Arc<TickerMatcher>,
    settings: Arc<SettingsService>,
    /// Rotation queue tried first on the next poll
    prefer_user_added: AtomicBool,
}

impl IngestionService {
    pub fn new(
        db: SqlitePool,
        entries: Arc<dyn EntrySource>,
        matcher: Arc<TickerMatcher>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            db,
            entries,
            matcher,
            settings,
            prefer_user_added: AtomicBool::new(false),
        }
    }

    /// Poll the feed source that has waited longest.
    ///
    /// Fetch and parse failures are logged and absorbed; only database
    /// failures while picking or bookkeeping the source are returned.
    /// Returns `None` when there are no feed sources.
    pub async fn poll_oldest_due_source(&self) -> AppResult<Option<PollSummary>> {
        let settings = self.settings.get().ingestion;

        let Some(source) = self.next_source(settings.partition_by_origin).await? else {
            tracing::debug!("No feed sources to poll");
            return Ok(None);
        };

        let mut summary = PollSummary {
            feed_source_id: source.id,
            ..Default::default()
        };

        match self.entries.fetch(&source.feed_url).await {
            Ok(entries) => {
                summary.fetched = entries.len();
                let since = dedup_since(Utc::now(), settings.dedup_window_days);
                for entry in entries {
                    let outcome = self.process_entry(&source, entry, since).await;
                    summary.record(outcome);
                }
            }
            Err(e) => {
                tracing::warn!("[{}] Feed fetch failed: {}", source.title, e);
                summary.fetch_failed = true;
            }
        }

        // Always advance, so a broken feed moves to the back of the queue
        FeedSourceRepository::mark_polled(&self.db, source.id, Utc::now()).await?;

        if summary.inserted > 0 || summary.failed > 0 {
            tracing::info!(
                "[{}] Polled {} entries: {} new, {} duplicate, {} unmatched, {} failed",
                source.title,
                summary.fetched,
                summary.inserted,
                summary.duplicates,
                summary.unmatched,
                summary.failed
            );
        } else {
            tracing::debug!(
                "[{}] Polled {} entries, nothing new",
                source.title,
                summary.fetched
            );
        }

        Ok(Some(summary))
    }

    /// Oldest-polled source. With partitioning, built-in and user-added
    /// queues take turns and an empty queue falls back to the other one.
    async fn next_source(&self, partition: bool) -> Result<Option<FeedSource>, sqlx::Error> {
        if !partition {
            return FeedSourceRepository::oldest_polled(&self.db, None).await;
        }

        let origin = if self.prefer_user_added.fetch_xor(true, Ordering::SeqCst) {
            SourceOrigin::UserAdded
        } else {
            SourceOrigin::BuiltIn
        };

        match FeedSourceRepository::oldest_polled(&self.db, Some(origin)).await? {
            Some(source) => Ok(Some(source)),
            None => FeedSourceRepository::oldest_polled(&self.db, Some(origin.other())).await,
        }
    }

    async fn process_entry(
        &self,
        source: &FeedSource,
        entry: FeedEntry,
        dedup_since: DateTime<Utc>,
    ) -> EntryOutcome {
        let title = entry.title.trim();

        let symbols = self
            .matcher
            .match_entry(title, entry.description.as_deref(), &entry.categories)
            .await;
        if symbols.is_empty() {
            tracing::debug!("[{}] No instruments in '{}'", source.title, title);
            return EntryOutcome::Unmatched;
        }

        match ArticleRepository::exists_with_title_since(&self.db, title, dedup_since).await {
            Ok(true) => {
                tracing::debug!("[{}] Duplicate title '{}'", source.title, title);
                return EntryOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!("[{}] Duplicate check failed for '{}': {}", source.title, title, e);
                return EntryOutcome::Failed;
            }
        }

        let data = CreateArticle {
            feed_source_id: source.id,
            title: title.to_string(),
            description: entry
                .description
                .as_deref()
                .map(|d| decode_entities(d).into_owned()),
            link: entry.link,
            publication_date: entry.published.unwrap_or_else(Utc::now),
            symbols: symbols.into_iter().collect(),
        };

        match ArticleRepository::create_with_instruments(&self.db, data).await {
            Ok(article) => {
                tracing::debug!("[{}] Stored article {} '{}'", source.title, article.id, title);
                EntryOutcome::Inserted
            }
            Err(e) => {
                tracing::error!("[{}] Failed to store '{}': {}", source.title, title, e);
                EntryOutcome::Failed
            }
        }
    }
}

/// Start of the duplicate-title window. A window reaching past the
/// representable range covers every stored article.
fn dedup_since(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(window_days))
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{CreateFeedSource, CreateInstrument, Settings};
    use crate::repositories::InstrumentRepository;
    use crate::services::SqliteDescriptionSearch;
    use httpmock::{Method::GET, MockServer};
    use std::time::Duration as StdDuration;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Wire</title>
  <item>
    <title>AAPL beats estimates</title>
    <description>&lt;p&gt;Apple &amp;amp; suppliers rally&lt;/p&gt;</description>
    <link>https://example.com/aapl</link>
    <pubDate>Tue, 10 Jun 2025 14:30:00 +0000</pubDate>
  </item>
  <item>
    <title>Acme Corp announces buyback</title>
    <link>https://example.com/acme</link>
  </item>
  <item>
    <title>Markets were quiet</title>
  </item>
  <item>
    <title>Sector wrap</title>
    <category>MSFT</category>
  </item>
</channel></rss>"#;

    struct Harness {
        pool: SqlitePool,
        service: IngestionService,
    }

    async fn harness(index_extra: &[&str], settings: Settings) -> Harness {
        let pool = test_pool().await;
        let instruments = [
            ("AAPL", "Apple Inc."),
            ("ACME", "ACME CORP"),
            ("MSFT", "Microsoft Corp"),
        ];
        for (symbol, description) in instruments {
            InstrumentRepository::create(&pool, CreateInstrument::new(symbol, description))
                .await
                .unwrap();
        }

        let mut index = crate::services::load_instrument_index(&pool, 100).await.unwrap();
        index.extend(index_extra.iter().copied());
        let matcher = TickerMatcher::new(
            Arc::new(index),
            Arc::new(SqliteDescriptionSearch::new(pool.clone())),
        );

        let service = IngestionService::new(
            pool.clone(),
            Arc::new(FeedClient::new(StdDuration::from_secs(5)).unwrap()),
            Arc::new(matcher),
            Arc::new(SettingsService::in_memory(settings)),
        );
        Harness { pool, service }
    }

    async fn add_source(pool: &SqlitePool, url: String, is_built_in: bool) -> FeedSource {
        FeedSourceRepository::create(
            pool,
            CreateFeedSource {
                title: url.clone(),
                site_url: String::new(),
                feed_url: url,
                is_built_in,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_poll_is_idempotent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200).body(FEED);
            })
            .await;

        let h = harness(&[], Settings::default()).await;
        let source = add_source(&h.pool, server.url("/rss"), true).await;

        let first = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(first.feed_source_id, source.id);
        assert_eq!(first.fetched, 4);
        assert_eq!(first.inserted, 3);
        assert_eq!(first.unmatched, 1);

        let second = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(ArticleRepository::count(&h.pool).await.unwrap(), 3);

        let polled = FeedSourceRepository::get_by_id(&h.pool, source.id)
            .await
            .unwrap()
            .unwrap();
        assert!(polled.last_polled_at.is_some());
    }

    #[tokio::test]
    async fn test_stored_article_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200).body(FEED);
            })
            .await;

        let h = harness(&[], Settings::default()).await;
        add_source(&h.pool, server.url("/rss"), true).await;
        h.service.poll_oldest_due_source().await.unwrap();

        let pending = ArticleRepository::pending_page(&h.pool, 10).await.unwrap();
        let aapl = pending
            .iter()
            .find(|p| p.article.title == "AAPL beats estimates")
            .unwrap();
        assert_eq!(aapl.symbols, vec!["AAPL"]);
        assert_eq!(
            aapl.article.description.as_deref(),
            Some("<p>Apple & suppliers rally</p>")
        );
        assert_eq!(aapl.article.publication_date.to_rfc3339(), "2025-06-10T14:30:00+00:00");

        let acme = pending
            .iter()
            .find(|p| p.article.title == "Acme Corp announces buyback")
            .unwrap();
        assert_eq!(acme.symbols, vec!["ACME"]);

        let wrap = pending.iter().find(|p| p.article.title == "Sector wrap").unwrap();
        assert_eq!(wrap.symbols, vec!["MSFT"]);
    }

    #[tokio::test]
    async fn test_failing_entry_does_not_abort_siblings() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200).body(
                    r#"<rss><channel>
                    <item><title>GHOST surges</title></item>
                    <item><title>MSFT slips</title></item>
                    </channel></rss>"#,
                );
            })
            .await;

        // GHOST is in the index but not in the instrument table
        let h = harness(&["GHOST"], Settings::default()).await;
        add_source(&h.pool, server.url("/rss"), true).await;

        let summary = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inserted, 1);
        assert_eq!(ArticleRepository::count(&h.pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_broken_feed_is_absorbed_and_rotated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200).body(FEED);
            })
            .await;

        let h = harness(&[], Settings::default()).await;
        let broken = add_source(&h.pool, server.url("/broken"), true).await;
        let healthy = add_source(&h.pool, server.url("/rss"), true).await;

        let first = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(first.feed_source_id, broken.id);
        assert!(first.fetch_failed);

        let second = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(second.feed_source_id, healthy.id);
        assert_eq!(second.inserted, 3);
    }

    #[tokio::test]
    async fn test_partitioned_rotation_alternates_origins() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body("<rss><channel></channel></rss>");
            })
            .await;

        let h = harness(&[], Settings::default()).await;
        let built_in_a = add_source(&h.pool, server.url("/a"), true).await;
        let built_in_b = add_source(&h.pool, server.url("/b"), true).await;
        let user = add_source(&h.pool, server.url("/user"), false).await;

        let mut order = Vec::new();
        for _ in 0..4 {
            let summary = h.service.poll_oldest_due_source().await.unwrap().unwrap();
            order.push(summary.feed_source_id);
        }

        assert_eq!(order, vec![built_in_a.id, user.id, built_in_b.id, user.id]);
    }

    #[tokio::test]
    async fn test_unpartitioned_rotation_is_strictly_oldest_first() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).body("<rss><channel></channel></rss>");
            })
            .await;

        let mut settings = Settings::default();
        settings.ingestion.partition_by_origin = false;
        let h = harness(&[], settings).await;
        let a = add_source(&h.pool, server.url("/a"), true).await;
        let b = add_source(&h.pool, server.url("/b"), true).await;
        let user = add_source(&h.pool, server.url("/user"), false).await;

        let mut order = Vec::new();
        for _ in 0..4 {
            let summary = h.service.poll_oldest_due_source().await.unwrap().unwrap();
            order.push(summary.feed_source_id);
        }

        assert_eq!(order, vec![a.id, b.id, user.id, a.id]);
    }

    #[test]
    fn test_dedup_since_never_overflows() {
        let now = Utc::now();
        assert_eq!(dedup_since(now, 30), now - Duration::days(30));
        assert_eq!(dedup_since(now, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[tokio::test]
    async fn test_oversized_dedup_window_still_polls() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200).body(FEED);
            })
            .await;

        let mut settings = Settings::default();
        settings.ingestion.dedup_window_days = u32::MAX;
        let h = harness(&[], settings).await;
        add_source(&h.pool, server.url("/rss"), true).await;

        let first = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(first.inserted, 3);
        let second = h.service.poll_oldest_due_source().await.unwrap().unwrap();
        assert_eq!(second.duplicates, 3);
    }

    #[tokio::test]
    async fn test_no_sources() {
        let h = harness(&[], Settings::default()).await;
        assert!(h.service.poll_oldest_due_source().await.unwrap().is_none());
    }
}
