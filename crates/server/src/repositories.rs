mod article;
mod feed_source;
mod instrument;
mod subscription;

pub use article::ArticleRepository;
pub use feed_source::FeedSourceRepository;
pub use instrument::InstrumentRepository;
pub use subscription::SubscriptionRepository;
