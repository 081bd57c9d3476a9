use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{Article, CreateArticle, FeedSource, PendingArticle};

const SELECT_ARTICLE: &str = r#"
    SELECT
        id, feed_source_id, title, description, link,
        publication_date, notifications_sent, created_at
    FROM articles
"#;

pub struct ArticleRepository;

impl ArticleRepository {
    /// Whether an article with exactly this title was created at or after `since`.
    pub async fn exists_with_title_since(
        pool: &SqlitePool,
        title: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE title = $1 AND created_at >= $2)",
        )
        .bind(title)
        .bind(since)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Insert an article and its instrument links in one transaction.
    pub async fn create_with_instruments(
        pool: &SqlitePool,
        data: CreateArticle,
    ) -> Result<Article, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            INSERT INTO articles (feed_source_id, title, description, link, publication_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING
                id, feed_source_id, title, description, link,
                publication_date, notifications_sent, created_at
            "#,
        )
        .bind(data.feed_source_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.link)
        .bind(data.publication_date)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for symbol in &data.symbols {
            sqlx::query("INSERT OR IGNORE INTO article_instruments (article_id, symbol) VALUES ($1, $2)")
                .bind(row.id)
                .bind(symbol)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Article>, sqlx::Error> {
        let query = format!("{} WHERE id = $1", SELECT_ARTICLE);
        let row = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    pub async fn symbols_for(pool: &SqlitePool, article_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT symbol FROM article_instruments WHERE article_id = $1 ORDER BY symbol ASC",
        )
        .bind(article_id)
        .fetch_all(pool)
        .await
    }

    /// Oldest unsent articles by publication date, with their instruments and source.
    pub async fn pending_page(
        pool: &SqlitePool,
        limit: u32,
    ) -> Result<Vec<PendingArticle>, sqlx::Error> {
        let rows = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT
                a.id, a.feed_source_id, a.title, a.description, a.link,
                a.publication_date, a.notifications_sent, a.created_at,
                fs.title AS source_title,
                fs.site_url AS source_site_url,
                fs.feed_url AS source_feed_url,
                fs.is_built_in AS source_is_built_in,
                fs.last_polled_at AS source_last_polled_at,
                fs.created_at AS source_created_at
            FROM articles a
            LEFT JOIN feed_sources fs ON fs.id = a.feed_source_id
            WHERE a.notifications_sent = 0
            ORDER BY a.publication_date ASC, a.id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        // Batch fetch instrument links to avoid N+1
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT article_id, symbol FROM article_instruments WHERE article_id IN (");
        let mut ids = builder.separated(", ");
        for row in &rows {
            ids.push_bind(row.id);
        }
        builder.push(") ORDER BY article_id, symbol");

        let links: Vec<(i64, String)> = builder.build_query_as().fetch_all(pool).await?;
        let mut symbols: HashMap<i64, Vec<String>> = HashMap::new();
        for (article_id, symbol) in links {
            symbols.entry(article_id).or_default().push(symbol);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let symbols = symbols.remove(&row.id).unwrap_or_default();
                row.into_pending(symbols)
            })
            .collect())
    }

    pub async fn mark_notifications_sent(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE articles SET notifications_sent = 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(pool)
            .await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    feed_source_id: Option<i64>,
    title: String,
    description: Option<String>,
    link: String,
    publication_date: DateTime<Utc>,
    notifications_sent: bool,
    created_at: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            feed_source_id: row.feed_source_id,
            title: row.title,
            description: row.description,
            link: row.link,
            publication_date: row.publication_date,
            notifications_sent: row.notifications_sent,
            created_at: row.created_at,
        }
    }
}

/// Article joined with its (possibly missing) feed source
#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    id: i64,
    feed_source_id: Option<i64>,
    title: String,
    description: Option<String>,
    link: String,
    publication_date: DateTime<Utc>,
    notifications_sent: bool,
    created_at: DateTime<Utc>,
    source_title: Option<String>,
    source_site_url: Option<String>,
    source_feed_url: Option<String>,
    source_is_built_in: Option<bool>,
    source_last_polled_at: Option<DateTime<Utc>>,
    source_created_at: Option<DateTime<Utc>>,
}

impl PendingRow {
    fn into_pending(self, symbols: Vec<String>) -> PendingArticle {
        let feed_source = match (
            self.feed_source_id,
            self.source_title,
            self.source_feed_url,
            self.source_created_at,
        ) {
            (Some(id), Some(title), Some(feed_url), Some(created_at)) => Some(FeedSource {
                id,
                title,
                site_url: self.source_site_url.unwrap_or_default(),
                feed_url,
                is_built_in: self.source_is_built_in.unwrap_or(false),
                last_polled_at: self.source_last_polled_at,
                created_at,
            }),
            _ => None,
        };

        PendingArticle {
            article: Article {
                id: self.id,
                feed_source_id: self.feed_source_id,
                title: self.title,
                description: self.description,
                link: self.link,
                publication_date: self.publication_date,
                notifications_sent: self.notifications_sent,
                created_at: self.created_at,
            },
            symbols,
            feed_source,
        }
    }
}
