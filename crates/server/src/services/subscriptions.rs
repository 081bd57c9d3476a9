use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use push::{topic_for, PushGateway};
use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::repositories::SubscriptionRepository;

/// Called by the profile/watchlist layer after a user's watchlist or feed
/// source subscriptions change.
#[async_trait]
pub trait TopicSubscriptionHook: Send + Sync {
    async fn subscriptions_changed(&self, user_id: i64) -> AppResult<()>;
}

/// Keeps `user_notification_topics` in line with watchlists and feed
/// subscriptions, and tells the user's devices when the set changes.
pub struct SubscriptionService {
    db: SqlitePool,
    gateway: Arc<dyn PushGateway>,
}

impl SubscriptionService {
    pub fn new(db: SqlitePool, gateway: Arc<dyn PushGateway>) -> Self {
        Self { db, gateway }
    }

    /// Recompute the user's topic set. Returns the new topics.
    ///
    /// Users without an active entitlement get an empty set. A silent push
    /// is sent only when the set actually changed; a failed silent push is
    /// logged and does not undo the update.
    pub async fn sync_user_topics(&self, user_id: i64) -> AppResult<Vec<String>> {
        let entitled = SubscriptionRepository::get_entitlement(&self.db, user_id)
            .await?
            .is_some_and(|entitlement| entitlement.is_active(Utc::now()));

        let pairs = if entitled {
            SubscriptionRepository::notification_pairs_for_user(&self.db, user_id).await?
        } else {
            Vec::new()
        };

        let mut topics: Vec<String> = pairs
            .iter()
            .filter_map(|(symbol, feed_source_id)| match topic_for(symbol, *feed_source_id) {
                Ok(topic) => Some(topic),
                Err(e) => {
                    tracing::warn!("User {}: {}", user_id, e);
                    None
                }
            })
            .collect();
        topics.sort();
        topics.dedup();

        let current = SubscriptionRepository::topics_for_user(&self.db, user_id).await?;
        if current == topics {
            tracing::debug!("Topics for user {} unchanged ({})", user_id, topics.len());
            return Ok(topics);
        }

        SubscriptionRepository::replace_user_topics(&self.db, user_id, &topics).await?;
        tracing::info!(
            "Topics for user {} updated: {} -> {}",
            user_id,
            current.len(),
            topics.len()
        );

        let mut data = BTreeMap::new();
        data.insert("type".to_string(), "topics_changed".to_string());
        data.insert("topicCount".to_string(), topics.len().to_string());
        if let Err(e) = self.gateway.send_silent_to_user(user_id, &data).await {
            tracing::warn!("Silent push to user {} failed: {}", user_id, e);
        }

        Ok(topics)
    }
}

#[async_trait]
impl TopicSubscriptionHook for SubscriptionService {
    async fn subscriptions_changed(&self, user_id: i64) -> AppResult<()> {
        self.sync_user_topics(user_id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{CreateFeedSource, CreateInstrument, Entitlement, SubscriptionStatus};
    use chrono::Duration;
    use crate::repositories::{FeedSourceRepository, InstrumentRepository};
    use push::{DeliveryReport, PushMessage};
    use std::sync::Mutex;

    #[derive(Default)]
    struct SilentRecorder {
        silent: Mutex<Vec<(i64, BTreeMap<String, String>)>>,
    }

    #[async_trait]
    impl PushGateway for SilentRecorder {
        async fn send_to_topic(&self, _topic: &str, _message: &PushMessage) -> push::Result<()> {
            Ok(())
        }

        async fn send_to_condition(
            &self,
            _condition: &str,
            _message: &PushMessage,
        ) -> push::Result<()> {
            Ok(())
        }

        async fn send_to_user(
            &self,
            _user_id: i64,
            _message: &PushMessage,
        ) -> push::Result<DeliveryReport> {
            Ok(DeliveryReport::default())
        }

        async fn send_silent_to_user(
            &self,
            user_id: i64,
            data: &BTreeMap<String, String>,
        ) -> push::Result<()> {
            self.silent.lock().unwrap().push((user_id, data.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sync_user_topics() {
        let pool = test_pool().await;
        for symbol in ["AAPL", "MSFT", "TSLA"] {
            InstrumentRepository::create(&pool, CreateInstrument::new(symbol, ""))
                .await
                .unwrap();
        }
        let mut sources = Vec::new();
        for name in ["a", "b"] {
            let source = FeedSourceRepository::create(
                &pool,
                CreateFeedSource {
                    title: name.to_string(),
                    site_url: String::new(),
                    feed_url: format!("https://example.com/{}", name),
                    is_built_in: true,
                },
            )
            .await
            .unwrap();
            sources.push(source.id);
        }

        SubscriptionRepository::set_watchlist_item(&pool, 1, "AAPL", true).await.unwrap();
        SubscriptionRepository::set_watchlist_item(&pool, 1, "MSFT", true).await.unwrap();
        SubscriptionRepository::set_watchlist_item(&pool, 1, "TSLA", false).await.unwrap();
        for id in &sources {
            SubscriptionRepository::set_feed_source_subscription(&pool, 1, *id, true)
                .await
                .unwrap();
        }

        let gateway = Arc::new(SilentRecorder::default());
        let service = SubscriptionService::new(pool.clone(), gateway.clone());

        // no entitlement row yet
        assert!(service.sync_user_topics(1).await.unwrap().is_empty());
        assert!(gateway.silent.lock().unwrap().is_empty());

        SubscriptionRepository::set_entitlement(
            &pool,
            1,
            Entitlement {
                status: SubscriptionStatus::Trial,
                until: Some(Utc::now() + Duration::days(7)),
            },
        )
        .await
        .unwrap();

        let topics = service.sync_user_topics(1).await.unwrap();
        let (a, b) = (sources[0], sources[1]);
        assert_eq!(
            topics,
            vec![
                format!("AAPL_ns_{}", a),
                format!("AAPL_ns_{}", b),
                format!("MSFT_ns_{}", a),
                format!("MSFT_ns_{}", b),
            ]
        );
        assert_eq!(SubscriptionRepository::topics_for_user(&pool, 1).await.unwrap(), topics);
        assert_eq!(gateway.silent.lock().unwrap().len(), 1);
        assert_eq!(gateway.silent.lock().unwrap()[0].1["type"], "topics_changed");

        // unchanged set sends nothing
        service.subscriptions_changed(1).await.unwrap();
        assert_eq!(gateway.silent.lock().unwrap().len(), 1);

        SubscriptionRepository::set_feed_source_subscription(&pool, 1, b, false)
            .await
            .unwrap();
        let topics = service.sync_user_topics(1).await.unwrap();
        assert_eq!(topics, vec![format!("AAPL_ns_{}", a), format!("MSFT_ns_{}", a)]);
        assert_eq!(gateway.silent.lock().unwrap().len(), 2);

        // an expired trial drops every topic
        SubscriptionRepository::set_entitlement(
            &pool,
            1,
            Entitlement {
                status: SubscriptionStatus::Trial,
                until: Some(Utc::now() - Duration::days(1)),
            },
        )
        .await
        .unwrap();
        assert!(service.sync_user_topics(1).await.unwrap().is_empty());
        assert!(SubscriptionRepository::topics_for_user(&pool, 1).await.unwrap().is_empty());
        assert_eq!(gateway.silent.lock().unwrap().len(), 3);
    }
}
