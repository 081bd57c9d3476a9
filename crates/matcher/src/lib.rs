//! Ticker extraction from free text.
//!
//! Three independent signals are united into one set of symbols:
//! 1. exact tokens that are known symbols (see [`InstrumentIndex`])
//! 2. instrument descriptions found by a ranked full-text search whose
//!    cleaned company name occurs verbatim in the text
//! 3. category tags that are known symbols
//!
//! # Example
//!
//! ```
//! use matcher::{InstrumentIndex, NoDescriptionSearch, TickerMatcher};
//! use std::sync::Arc;
//!
//! # tokio_test_block(async {
//! let index = InstrumentIndex::from_symbols(["AAPL", "MSFT"]);
//! let matcher = TickerMatcher::new(Arc::new(index), Arc::new(NoDescriptionSearch));
//!
//! let symbols = matcher.match_instruments("Coverage of AAPL today", false).await;
//! assert!(symbols.contains("AAPL"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

mod index;
mod matcher;
pub mod text;

pub use index::InstrumentIndex;
pub use matcher::{Candidate, DescriptionSearch, NoDescriptionSearch, TickerMatcher};

/// Tokens shorter than this are never treated as symbols or search terms.
pub const MIN_TOKEN_LEN: usize = 3;

/// Default number of full-text candidates considered per text.
pub const DEFAULT_SEARCH_LIMIT: usize = 32;
