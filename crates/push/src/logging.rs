use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::gateway::PushGateway;
use crate::message::{DeliveryReport, PushMessage};

/// Gateway that only logs what would have been sent.
///
/// Used when no relay endpoint is configured, e.g. in development.
#[derive(Debug, Default)]
pub struct LogGateway;

#[async_trait]
impl PushGateway for LogGateway {
    async fn send_to_topic(&self, topic: &str, message: &PushMessage) -> crate::Result<()> {
        tracing::info!("[push:dry-run] topic={} title={}", topic, message.title);
        Ok(())
    }

    async fn send_to_condition(
        &self,
        condition: &str,
        message: &PushMessage,
    ) -> crate::Result<()> {
        tracing::info!(
            "[push:dry-run] condition=({}) title={}",
            condition,
            message.title
        );
        Ok(())
    }

    async fn send_to_user(
        &self,
        user_id: i64,
        message: &PushMessage,
    ) -> crate::Result<DeliveryReport> {
        tracing::info!(
            "[push:dry-run] user={} title={} body={}",
            user_id,
            message.title,
            message.body
        );
        Ok(DeliveryReport {
            sent: true,
            sent_with_errors: false,
        })
    }

    async fn send_silent_to_user(
        &self,
        user_id: i64,
        data: &BTreeMap<String, String>,
    ) -> crate::Result<()> {
        tracing::debug!("[push:dry-run] silent user={} data={:?}", user_id, data);
        Ok(())
    }
}
