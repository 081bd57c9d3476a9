use async_trait::async_trait;
use matcher::{Candidate, DescriptionSearch, InstrumentIndex};
use sqlx::SqlitePool;

use crate::repositories::InstrumentRepository;

/// Build the symbol snapshot by paging through the instrument table.
///
/// Stops at the first page shorter than `page_size`.
pub async fn load_instrument_index(
    pool: &SqlitePool,
    page_size: u32,
) -> Result<InstrumentIndex, sqlx::Error> {
    let page_size = page_size.max(1);
    let mut index = InstrumentIndex::new();
    let mut after: Option<String> = None;

    loop {
        let page = InstrumentRepository::page_after(pool, after.as_deref(), page_size).await?;
        let is_last = page.len() < page_size as usize;
        after = page.last().cloned();
        index.extend(page);

        if is_last || after.is_none() {
            break;
        }
    }

    tracing::info!(
        "Loaded {} instrument symbols (~{} KiB)",
        index.len(),
        index.approx_size_bytes() / 1024
    );
    Ok(index)
}

/// Description search backed by the `instruments_fts` index.
pub struct SqliteDescriptionSearch {
    db: SqlitePool,
}

impl SqliteDescriptionSearch {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DescriptionSearch for SqliteDescriptionSearch {
    async fn search(&self, terms: &[String], limit: usize) -> anyhow::Result<Vec<Candidate>> {
        let Some(query) = fts_query(terms) else {
            return Ok(Vec::new());
        };
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);

        let instruments = InstrumentRepository::search_descriptions(&self.db, &query, limit).await?;
        Ok(instruments
            .into_iter()
            .map(|i| Candidate {
                symbol: i.symbol,
                description: i.description,
            })
            .collect())
    }
}

/// OR of quoted terms, e.g. `"apple" OR "shares"`. Quotes inside a term are doubled.
fn fts_query(terms: &[String]) -> Option<String> {
    let quoted: Vec<String> = terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();

    if quoted.is_empty() {
        None
    } else {
        Some(quoted.join(" OR "))
    }
}
