//! Feed retrieval and parsing.
//!
//! Fetches a syndicated news document (RSS 2.0 or Atom) over HTTP and turns it
//! into a flat list of [`FeedEntry`] values. Transport and parse failures are
//! reported separately so callers can treat one broken feed as recoverable.

mod client;
mod error;
pub mod models;
mod parser;

pub use client::FeedClient;
pub use error::FeedError;
pub use models::FeedEntry;
pub use parser::parse_feed;

pub type Result<T> = std::result::Result<T, FeedError>;
