use sqlx::SqlitePool;

use crate::models::{CreateInstrument, Instrument};

pub struct InstrumentRepository;

impl InstrumentRepository {
    pub async fn create(
        pool: &SqlitePool,
        data: CreateInstrument,
    ) -> Result<Instrument, sqlx::Error> {
        let row = sqlx::query_as::<_, InstrumentRow>(
            r#"
            INSERT INTO instruments (symbol, description, market_id, instrument_type)
            VALUES ($1, $2, $3, $4)
            RETURNING id, symbol, description, market_id, instrument_type
            "#,
        )
        .bind(&data.symbol)
        .bind(&data.description)
        .bind(data.market_id)
        .bind(&data.instrument_type)
        .fetch_one(pool)
        .await?;

        Ok(row.into())
    }

    /// Next page of symbols strictly after `after`, ascending.
    pub async fn page_after(
        pool: &SqlitePool,
        after: Option<&str>,
        limit: u32,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT symbol FROM instruments WHERE symbol > $1 ORDER BY symbol ASC LIMIT $2",
        )
        .bind(after.unwrap_or(""))
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
    }

    /// Full-text search over descriptions, best rank first.
    ///
    /// `query` is an FTS5 match expression.
    pub async fn search_descriptions(
        pool: &SqlitePool,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Instrument>, sqlx::Error> {
        let rows = sqlx::query_as::<_, InstrumentRow>(
            r#"
            SELECT i.id, i.symbol, i.description, i.market_id, i.instrument_type
            FROM instruments_fts
            JOIN instruments i ON i.id = instruments_fts.rowid
            WHERE instruments_fts MATCH $1
            ORDER BY instruments_fts.rank
            LIMIT $2
            "#,
        )
        .bind(query)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM instruments")
            .fetch_one(pool)
            .await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InstrumentRow {
    id: i64,
    symbol: String,
    description: String,
    market_id: Option<i64>,
    instrument_type: String,
}

impl From<InstrumentRow> for Instrument {
    fn from(row: InstrumentRow) -> Self {
        Self {
            id: row.id,
            symbol: row.symbol,
            description: row.description,
            market_id: row.market_id,
            instrument_type: row.instrument_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed(pool: &SqlitePool, rows: &[(&str, &str)]) {
        for (symbol, description) in rows {
            InstrumentRepository::create(pool, CreateInstrument::new(*symbol, *description))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_page_after_is_keyset_ordered() {
        let pool = test_pool().await;
        seed(&pool, &[("MSFT", ""), ("AAPL", ""), ("NVDA", ""), ("AMZN", "")]).await;

        let first = InstrumentRepository::page_after(&pool, None, 2).await.unwrap();
        assert_eq!(first, vec!["AAPL", "AMZN"]);

        let second = InstrumentRepository::page_after(&pool, Some("AMZN"), 2)
            .await
            .unwrap();
        assert_eq!(second, vec!["MSFT", "NVDA"]);

        let third = InstrumentRepository::page_after(&pool, Some("NVDA"), 2)
            .await
            .unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_search_descriptions() {
        let pool = test_pool().await;
        seed(
            &pool,
            &[
                ("ACME", "ACME CORP"),
                ("AAPL", "Apple Inc."),
                ("BAC", "Bank of America Corp"),
            ],
        )
        .await;

        let found = InstrumentRepository::search_descriptions(&pool, "\"acme\" OR \"apple\"", 10)
            .await
            .unwrap();
        let mut symbols: Vec<_> = found.into_iter().map(|i| i.symbol).collect();
        symbols.sort();
        assert_eq!(symbols, vec!["AAPL", "ACME"]);

        let limited = InstrumentRepository::search_descriptions(&pool, "\"corp\"", 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
