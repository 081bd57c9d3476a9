use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{CreateFeedSource, FeedSource, SourceOrigin};

const SELECT_FEED_SOURCE: &str = r#"
    SELECT id, title, site_url, feed_url, is_built_in, last_polled_at, created_at
    FROM feed_sources
"#;

/// Never-polled sources first, then oldest poll, ties broken by id.
const ROTATION_ORDER: &str =
    "ORDER BY last_polled_at IS NOT NULL, last_polled_at ASC, id ASC LIMIT 1";

pub struct FeedSourceRepository;

impl FeedSourceRepository {
    pub async fn create(
        pool: &SqlitePool,
        data: CreateFeedSource,
    ) -> Result<FeedSource, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feed_sources (title, site_url, feed_url, is_built_in, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&data.title)
        .bind(&data.site_url)
        .bind(&data.feed_url)
        .bind(data.is_built_in)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Self::get_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<FeedSource>, sqlx::Error> {
        let query = format!("{} WHERE id = $1", SELECT_FEED_SOURCE);
        let row = sqlx::query_as::<_, FeedSourceRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn get_all(pool: &SqlitePool) -> Result<Vec<FeedSource>, sqlx::Error> {
        let query = format!("{} ORDER BY id ASC", SELECT_FEED_SOURCE);
        let rows = sqlx::query_as::<_, FeedSourceRow>(&query)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The source that has waited longest for a poll, optionally restricted
    /// to one rotation queue.
    pub async fn oldest_polled(
        pool: &SqlitePool,
        origin: Option<SourceOrigin>,
    ) -> Result<Option<FeedSource>, sqlx::Error> {
        let row = match origin {
            Some(origin) => {
                let query = format!("{} WHERE is_built_in = $1 {}", SELECT_FEED_SOURCE, ROTATION_ORDER);
                sqlx::query_as::<_, FeedSourceRow>(&query)
                    .bind(origin.is_built_in())
                    .fetch_optional(pool)
                    .await?
            }
            None => {
                let query = format!("{} {}", SELECT_FEED_SOURCE, ROTATION_ORDER);
                sqlx::query_as::<_, FeedSourceRow>(&query)
                    .fetch_optional(pool)
                    .await?
            }
        };

        Ok(row.map(Into::into))
    }

    pub async fn mark_polled(
        pool: &SqlitePool,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE feed_sources SET last_polled_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count_built_in(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM feed_sources WHERE is_built_in = 1")
            .fetch_one(pool)
            .await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FeedSourceRow {
    id: i64,
    title: String,
    site_url: String,
    feed_url: String,
    is_built_in: bool,
    last_polled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<FeedSourceRow> for FeedSource {
    fn from(row: FeedSourceRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            site_url: row.site_url,
            feed_url: row.feed_url,
            is_built_in: row.is_built_in,
            last_polled_at: row.last_polled_at,
            created_at: row.created_at,
        }
    }
}
