use feed::FeedClient;
use matcher::TickerMatcher;
use push::{HttpGateway, HttpGatewayConfig, LogGateway, PushGateway};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::services::{
    load_instrument_index, FanoutService, IngestionService, NewsIngestJob, NewsNotifyJob,
    SchedulerService, SettingsService, SqliteDescriptionSearch, SqliteSubscriptionResolver,
    SubscriptionService,
};

/// Long-lived services of the pipeline, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub settings: Arc<SettingsService>,
    pub gateway: Arc<dyn PushGateway>,
    pub matcher: Arc<TickerMatcher>,
    pub ingestion: Arc<IngestionService>,
    pub fanout: Arc<FanoutService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub scheduler: Arc<SchedulerService>,
}

impl AppState {
    /// Build every service. The symbol index is loaded here, so startup
    /// fails if the instrument table cannot be read.
    pub async fn new(db: SqlitePool, config: Config, settings: SettingsService) -> AppResult<Self> {
        let settings = Arc::new(settings);
        let current = settings.get();

        let gateway = create_gateway(&current.push)?;

        let index = load_instrument_index(&db, current.matcher.index_page_size).await?;
        let search = Arc::new(SqliteDescriptionSearch::new(db.clone()));
        let matcher = Arc::new(
            TickerMatcher::new(Arc::new(index), search)
                .with_search_limit(current.matcher.search_limit as usize),
        );

        let feed_client = Arc::new(FeedClient::new(current.ingestion.fetch_timeout())?);
        let ingestion = Arc::new(IngestionService::new(
            db.clone(),
            feed_client,
            Arc::clone(&matcher),
            Arc::clone(&settings),
        ));

        let resolver = Arc::new(SqliteSubscriptionResolver::new(db.clone()));
        let fanout = Arc::new(FanoutService::new(
            db.clone(),
            Arc::clone(&gateway),
            resolver,
            Arc::clone(&settings),
        ));

        let subscriptions = Arc::new(SubscriptionService::new(db.clone(), Arc::clone(&gateway)));

        let scheduler = Arc::new(
            SchedulerService::new()
                .with_job(NewsIngestJob::new(
                    Arc::clone(&ingestion),
                    current.ingestion.interval(),
                ))
                .with_job(NewsNotifyJob::new(
                    Arc::clone(&fanout),
                    current.fanout.interval(),
                )),
        );

        Ok(Self {
            db,
            config: Arc::new(config),
            settings,
            gateway,
            matcher,
            ingestion,
            fanout,
            subscriptions,
            scheduler,
        })
    }
}

fn create_gateway(settings: &crate::models::PushSettings) -> AppResult<Arc<dyn PushGateway>> {
    if settings.endpoint.is_empty() {
        tracing::warn!("No push endpoint configured, notifications will only be logged");
        return Ok(Arc::new(LogGateway));
    }

    let gateway = HttpGateway::new(HttpGatewayConfig {
        endpoint: settings.endpoint.clone(),
        api_key: settings.api_key.clone(),
        timeout: settings.timeout(),
    })?;
    Ok(Arc::new(gateway))
}
