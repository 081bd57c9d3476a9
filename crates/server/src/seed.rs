use sqlx::SqlitePool;

use crate::models::CreateFeedSource;
use crate::repositories::FeedSourceRepository;

/// (title, site url, feed url)
const BUILT_IN_SOURCES: &[(&str, &str, &str)] = &[
    ("Benzinga", "https://www.benzinga.com/", "http://feeds.benzinga.com/benzinga"),
    ("TheStreet.com", "https://www.thestreet.com/", "https://www.thestreet.com/.rss/full/"),
    ("Oilprice.com", "https://oilprice.com/", "https://oilprice.com/rss/main"),
    ("Quartz", "https://qz.com/", "https://cms.qz.com/feed/"),
    ("The Independent", "https://www.independent.co.uk/", "https://www.independent.co.uk/rss"),
    ("Financial Times", "https://www.ft.com/", "https://www.ft.com/?format=rss"),
    ("Yahoo Finance", "https://finance.yahoo.com/", "https://finance.yahoo.com/news/rssindex"),
    (
        "PR Newswire",
        "https://www.prnewswire.com",
        "https://www.prnewswire.com/rss/news-releases-list.rss",
    ),
    ("Zacks", "https://www.zacks.com", "https://scr.zacks.com/rss/pressrelease.aspx"),
    (
        "MarketWatch",
        "https://www.marketwatch.com",
        "http://feeds.marketwatch.com/marketwatch/topstories/",
    ),
];

/// Insert the curated feed sources on first start.
///
/// Does nothing once any built-in source exists. Returns the number inserted.
pub async fn seed_feed_sources(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    if FeedSourceRepository::count_built_in(pool).await? > 0 {
        return Ok(0);
    }

    tracing::info!("Seeding {} built-in feed sources...", BUILT_IN_SOURCES.len());

    for (title, site_url, feed_url) in BUILT_IN_SOURCES {
        FeedSourceRepository::create(
            pool,
            CreateFeedSource {
                title: title.to_string(),
                site_url: site_url.to_string(),
                feed_url: feed_url.to_string(),
                is_built_in: true,
            },
        )
        .await?;
    }

    Ok(BUILT_IN_SOURCES.len())
}
