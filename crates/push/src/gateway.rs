use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::message::{DeliveryReport, PushMessage};

/// External push delivery service.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver to every device subscribed to a single topic.
    async fn send_to_topic(&self, topic: &str, message: &PushMessage) -> crate::Result<()>;

    /// Deliver to devices matching a boolean topic condition
    /// (`'a' in topics || 'b' in topics`, at most five topics).
    async fn send_to_condition(&self, condition: &str, message: &PushMessage)
        -> crate::Result<()>;

    /// Deliver to all registered devices of one user.
    async fn send_to_user(&self, user_id: i64, message: &PushMessage)
        -> crate::Result<DeliveryReport>;

    /// Background data push with no visible alert.
    async fn send_silent_to_user(
        &self,
        user_id: i64,
        data: &BTreeMap<String, String>,
    ) -> crate::Result<()>;
}
