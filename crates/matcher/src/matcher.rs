use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::index::InstrumentIndex;
use crate::text::{canonical_text, clean_description, html_to_text, significant_tokens, tokenize};
use crate::{DEFAULT_SEARCH_LIMIT, MIN_TOKEN_LEN};

/// Instrument returned by a description search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub symbol: String,
    pub description: String,
}

/// Ranked full-text search over instrument descriptions.
#[async_trait]
pub trait DescriptionSearch: Send + Sync {
    /// Return at most `limit` instruments whose description matches any of
    /// `terms`, best match first.
    async fn search(&self, terms: &[String], limit: usize) -> anyhow::Result<Vec<Candidate>>;
}

/// Search backend that never returns candidates (exact-token matching only).
pub struct NoDescriptionSearch;

#[async_trait]
impl DescriptionSearch for NoDescriptionSearch {
    async fn search(&self, _terms: &[String], _limit: usize) -> anyhow::Result<Vec<Candidate>> {
        Ok(Vec::new())
    }
}

/// Extracts referenced ticker symbols from news text.
pub struct TickerMatcher {
    index: Arc<InstrumentIndex>,
    search: Arc<dyn DescriptionSearch>,
    search_limit: usize,
}

impl TickerMatcher {
    pub fn new(index: Arc<InstrumentIndex>, search: Arc<dyn DescriptionSearch>) -> Self {
        Self {
            index,
            search,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    pub fn index(&self) -> &InstrumentIndex {
        &self.index
    }

    /// Symbols referenced by `text`, either verbatim or by company name.
    ///
    /// A failing description search degrades to the exact-token result.
    pub async fn match_instruments(&self, text: &str, is_html: bool) -> BTreeSet<String> {
        let plain = if is_html {
            html_to_text(text)
        } else {
            text.to_string()
        };

        let tokens = tokenize(&plain);
        let mut symbols = self.match_tokens(&tokens);

        let mut terms: Vec<String> = Vec::new();
        for token in significant_tokens(&tokens) {
            if !terms.contains(token) {
                terms.push(token.clone());
            }
        }
        if terms.is_empty() {
            return symbols;
        }

        match self.search.search(&terms, self.search_limit).await {
            Ok(candidates) => {
                let source = canonical_text(&tokens);
                symbols.extend(accept_candidates(&source, candidates));
            }
            Err(e) => {
                tracing::warn!("Description search failed, using exact tokens only: {}", e);
            }
        }

        symbols
    }

    /// Category tags are matched by exact lookup without text processing.
    pub fn match_categories(&self, categories: &[String]) -> BTreeSet<String> {
        categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| self.index.contains(c))
            .map(str::to_string)
            .collect()
    }

    /// Union of the description (HTML), title (plain) and category signals.
    pub async fn match_entry(
        &self,
        title: &str,
        description: Option<&str>,
        categories: &[String],
    ) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();

        if let Some(description) = description {
            symbols.extend(self.match_instruments(description, true).await);
        }
        symbols.extend(self.match_instruments(title, false).await);
        symbols.extend(self.match_categories(categories));

        symbols
    }

    fn match_tokens(&self, tokens: &[String]) -> BTreeSet<String> {
        significant_tokens(tokens)
            .filter(|t| self.index.contains(t))
            .cloned()
            .collect()
    }
}

/// Keep candidates whose cleaned description occurs in the canonical source text.
fn accept_candidates(source: &str, candidates: Vec<Candidate>) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let name = clean_description(&candidate.description);
            name.chars().count() >= MIN_TOKEN_LEN && source.contains(&name)
        })
        .map(|candidate| candidate.symbol)
        .collect()
}
