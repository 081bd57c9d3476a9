use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{Entitlement, SubscriptionStatus};

/// Reads and writes the user-side tables the pipeline depends on:
/// feed source subscriptions, watchlists, entitlements and topic rows.
pub struct SubscriptionRepository;

impl SubscriptionRepository {
    /// Users eligible for a notification about `article_id`, ascending by id.
    ///
    /// Eligible means: subscribed to the article's feed source, notifications
    /// enabled on at least one of its instruments, and an active entitlement.
    pub async fn eligible_recipients_page(
        pool: &SqlitePool,
        article_id: i64,
        feed_source_id: i64,
        after_user_id: Option<i64>,
        limit: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT p.user_id
            FROM profile_feed_sources p
            JOIN subscription_info s ON s.user_id = p.user_id
            WHERE p.feed_source_id = $1
              AND p.user_id > $2
              AND (s.status = $3 OR (s.status = $4 AND (s.until IS NULL OR s.until > $5)))
              AND EXISTS (
                  SELECT 1
                  FROM watchlist_items w
                  JOIN article_instruments ai ON ai.symbol = w.symbol
                  WHERE w.user_id = p.user_id
                    AND w.notifications_enabled = 1
                    AND ai.article_id = $6
              )
            ORDER BY p.user_id ASC
            LIMIT $7
            "#,
        )
        .bind(feed_source_id)
        .bind(after_user_id.unwrap_or(i64::MIN))
        .bind(SubscriptionStatus::Subscribed.as_i64())
        .bind(SubscriptionStatus::Trial.as_i64())
        .bind(now)
        .bind(article_id)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
    }

    /// (symbol, feed source) pairs a user should be subscribed to as topics.
    pub async fn notification_pairs_for_user(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT w.symbol, p.feed_source_id
            FROM watchlist_items w
            JOIN profile_feed_sources p ON p.user_id = w.user_id
            WHERE w.user_id = $1 AND w.notifications_enabled = 1
            ORDER BY w.symbol ASC, p.feed_source_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn topics_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT topic FROM user_notification_topics WHERE user_id = $1 ORDER BY topic ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the user's stored topic set atomically.
    pub async fn replace_user_topics(
        pool: &SqlitePool,
        user_id: i64,
        topics: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM user_notification_topics WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for topic in topics {
            sqlx::query(
                "INSERT OR IGNORE INTO user_notification_topics (user_id, topic) VALUES ($1, $2)",
            )
            .bind(user_id)
            .bind(topic)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn set_feed_source_subscription(
        pool: &SqlitePool,
        user_id: i64,
        feed_source_id: i64,
        subscribed: bool,
    ) -> Result<(), sqlx::Error> {
        let query = if subscribed {
            "INSERT OR IGNORE INTO profile_feed_sources (user_id, feed_source_id) VALUES ($1, $2)"
        } else {
            "DELETE FROM profile_feed_sources WHERE user_id = $1 AND feed_source_id = $2"
        };
        sqlx::query(query)
            .bind(user_id)
            .bind(feed_source_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Add or update a watchlist entry.
    pub async fn set_watchlist_item(
        pool: &SqlitePool,
        user_id: i64,
        symbol: &str,
        notifications_enabled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO watchlist_items (user_id, symbol, notifications_enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, symbol) DO UPDATE SET
                notifications_enabled = excluded.notifications_enabled
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .bind(notifications_enabled)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_entitlement(
        pool: &SqlitePool,
        user_id: i64,
        entitlement: Entitlement,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO subscription_info (user_id, status, until)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                status = excluded.status,
                until = excluded.until
            "#,
        )
        .bind(user_id)
        .bind(entitlement.status.as_i64())
        .bind(entitlement.until)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_entitlement(
        pool: &SqlitePool,
        user_id: i64,
    ) -> Result<Option<Entitlement>, sqlx::Error> {
        let row: Option<(i64, Option<DateTime<Utc>>)> =
            sqlx::query_as("SELECT status, until FROM subscription_info WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        Ok(row.and_then(|(status, until)| {
            SubscriptionStatus::from_i64(status).map(|status| Entitlement { status, until })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::{CreateArticle, CreateFeedSource, CreateInstrument};
    use crate::repositories::{ArticleRepository, FeedSourceRepository, InstrumentRepository};
    use chrono::Duration;

    struct Fixture {
        pool: SqlitePool,
        source_id: i64,
        other_source_id: i64,
        article_id: i64,
    }

    async fn fixture() -> Fixture {
        let pool = test_pool().await;
        for symbol in ["AAPL", "MSFT", "TSLA"] {
            InstrumentRepository::create(&pool, CreateInstrument::new(symbol, ""))
                .await
                .unwrap();
        }
        let mut ids = Vec::new();
        for name in ["wire", "other"] {
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
            ids.push(source.id);
        }
        let article = ArticleRepository::create_with_instruments(
            &pool,
            CreateArticle {
                feed_source_id: ids[0],
                title: "AAPL and MSFT".to_string(),
                description: None,
                link: String::new(),
                publication_date: Utc::now(),
                symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            },
        )
        .await
        .unwrap();

        Fixture {
            pool,
            source_id: ids[0],
            other_source_id: ids[1],
            article_id: article.id,
        }
    }

    async fn user(
        f: &Fixture,
        user_id: i64,
        source_id: i64,
        symbol: &str,
        enabled: bool,
        entitlement: Entitlement,
    ) {
        SubscriptionRepository::set_feed_source_subscription(&f.pool, user_id, source_id, true)
            .await
            .unwrap();
        SubscriptionRepository::set_watchlist_item(&f.pool, user_id, symbol, enabled)
            .await
            .unwrap();
        SubscriptionRepository::set_entitlement(&f.pool, user_id, entitlement)
            .await
            .unwrap();
    }

    fn subscribed() -> Entitlement {
        Entitlement {
            status: SubscriptionStatus::Subscribed,
            until: None,
        }
    }

    #[tokio::test]
    async fn test_eligible_recipients_filters_every_condition() {
        let f = fixture().await;
        let now = Utc::now();
        let expired_trial = Entitlement {
            status: SubscriptionStatus::Trial,
            until: Some(now - Duration::days(1)),
        };
        let open_trial = Entitlement {
            status: SubscriptionStatus::Trial,
            until: Some(now + Duration::days(3)),
        };

        user(&f, 1, f.source_id, "AAPL", true, subscribed()).await;
        user(&f, 2, f.source_id, "MSFT", true, open_trial).await;
        user(&f, 3, f.source_id, "AAPL", true, expired_trial).await;
        user(&f, 4, f.source_id, "AAPL", false, subscribed()).await;
        user(&f, 5, f.source_id, "TSLA", true, subscribed()).await;
        user(&f, 6, f.other_source_id, "AAPL", true, subscribed()).await;
        // no subscription_info row at all
        SubscriptionRepository::set_feed_source_subscription(&f.pool, 7, f.source_id, true)
            .await
            .unwrap();
        SubscriptionRepository::set_watchlist_item(&f.pool, 7, "AAPL", true)
            .await
            .unwrap();

        let recipients = SubscriptionRepository::eligible_recipients_page(
            &f.pool,
            f.article_id,
            f.source_id,
            None,
            100,
            now,
        )
        .await
        .unwrap();

        assert_eq!(recipients, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_eligible_recipients_keyset_paging() {
        let f = fixture().await;
        for user_id in 1..=5 {
            user(&f, user_id, f.source_id, "AAPL", true, subscribed()).await;
            // a second matching instrument must not duplicate the user
            SubscriptionRepository::set_watchlist_item(&f.pool, user_id, "MSFT", true)
                .await
                .unwrap();
        }

        let now = Utc::now();
        let page = |after| {
            SubscriptionRepository::eligible_recipients_page(
                &f.pool,
                f.article_id,
                f.source_id,
                after,
                2,
                now,
            )
        };

        assert_eq!(page(None).await.unwrap(), vec![1, 2]);
        assert_eq!(page(Some(2)).await.unwrap(), vec![3, 4]);
        assert_eq!(page(Some(4)).await.unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn test_replace_user_topics() {
        let f = fixture().await;
        let topics = vec!["AAPL_ns_1".to_string(), "MSFT_ns_1".to_string()];
        SubscriptionRepository::replace_user_topics(&f.pool, 9, &topics)
            .await
            .unwrap();
        SubscriptionRepository::replace_user_topics(&f.pool, 9, &topics[1..])
            .await
            .unwrap();

        assert_eq!(
            SubscriptionRepository::topics_for_user(&f.pool, 9).await.unwrap(),
            vec!["MSFT_ns_1"]
        );
    }

    #[tokio::test]
    async fn test_entitlement_upsert() {
        let f = fixture().await;
        SubscriptionRepository::set_entitlement(
            &f.pool,
            3,
            Entitlement {
                status: SubscriptionStatus::Trial,
                until: None,
            },
        )
        .await
        .unwrap();
        SubscriptionRepository::set_entitlement(&f.pool, 3, subscribed())
            .await
            .unwrap();

        let stored = SubscriptionRepository::get_entitlement(&f.pool, 3).await.unwrap();
        assert_eq!(stored, Some(subscribed()));
    }
}
