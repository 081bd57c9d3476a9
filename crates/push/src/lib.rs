//! Push gateway abstraction.
//!
//! The gateway itself (device tokens, APNs/FCM delivery) lives outside this
//! service; this crate defines the seam ([`PushGateway`]), the deterministic
//! topic naming rule, and the condition batching the gateway requires.

mod dispatcher;
mod error;
mod gateway;
mod http;
mod logging;
mod message;
pub mod topic;

pub use dispatcher::{TopicDispatcher, TopicSendSummary};
pub use error::PushError;
pub use gateway::PushGateway;
pub use http::{HttpGateway, HttpGatewayConfig};
pub use logging::LogGateway;
pub use message::{DeliveryReport, PushMessage};
pub use topic::{condition_for, topic_for, with_prefix, MAX_CONDITION_TOPICS, TOPIC_SEPARATOR};

pub type Result<T> = std::result::Result<T, PushError>;
