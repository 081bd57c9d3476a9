use std::time::Duration;

use reqwest::Client;

use crate::error::FeedError;
use crate::models::FeedEntry;
use crate::parser::parse_feed;

const USER_AGENT: &str = concat!("newswire/", env!("CARGO_PKG_VERSION"));

/// Feed fetcher client
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch and parse a feed document
    ///
    /// # Example
    /// ```no_run
    /// use feed::FeedClient;
    /// use std::time::Duration;
    ///
    /// # async fn example() -> feed::Result<()> {
    /// let client = FeedClient::new(Duration::from_secs(30))?;
    /// let entries = client.fetch("http://feeds.benzinga.com/benzinga").await?;
    ///
    /// for entry in entries {
    ///     println!("{}", entry.title);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch(&self, url: &str) -> crate::Result<Vec<FeedEntry>> {
        tracing::debug!("Fetching feed from: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        let entries = parse_feed(&bytes)?;

        tracing::debug!("Parsed {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};

    const FEED: &str = r#"<rss version="2.0"><channel><title>t</title>
<item><title>NVDA hits record</title><link>https://example.com/nvda</link></item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_fetch_parses_entries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200)
                    .header("content-type", "application/rss+xml")
                    .body(FEED);
            })
            .await;

        let client = FeedClient::new(Duration::from_secs(5)).unwrap();
        let entries = client.fetch(&server.url("/rss")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "NVDA hits record");
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(503);
            })
            .await;

        let client = FeedClient::new(Duration::from_secs(5)).unwrap();
        let err = client.fetch(&server.url("/rss")).await.unwrap_err();

        assert!(matches!(err, FeedError::Status { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200).body("this is not xml");
            })
            .await;

        let client = FeedClient::new(Duration::from_secs(5)).unwrap();
        let err = client.fetch(&server.url("/rss")).await.unwrap_err();

        assert!(matches!(err, FeedError::Parse(_)));
        assert!(!err.is_transient());
    }
}
