use std::sync::Arc;

use crate::gateway::PushGateway;
use crate::message::PushMessage;
use crate::topic::{condition_for, with_prefix, MAX_CONDITION_TOPICS};

/// Result of a topic fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopicSendSummary {
    /// Gateway calls issued.
    pub calls: usize,
    /// Calls that returned an error (logged, not raised).
    pub failures: usize,
}

/// Sends one message to a set of topics, batching them into OR-conditions
/// of at most [`MAX_CONDITION_TOPICS`] topics per gateway call.
#[derive(Clone)]
pub struct TopicDispatcher {
    gateway: Arc<dyn PushGateway>,
    topic_prefix: String,
}

impl TopicDispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, topic_prefix: impl Into<String>) -> Self {
        Self {
            gateway,
            topic_prefix: topic_prefix.into(),
        }
    }

    /// A single topic goes out as a plain topic send; anything larger is
    /// chunked into conditions. Gateway errors are logged per call.
    pub async fn send_to_topics(&self, topics: &[String], message: &PushMessage) -> TopicSendSummary {
        let mut summary = TopicSendSummary::default();

        match topics {
            [] => {}
            [topic] => {
                let topic = with_prefix(topic, &self.topic_prefix);
                summary.calls += 1;
                if let Err(e) = self.gateway.send_to_topic(&topic, message).await {
                    tracing::warn!("Failed to send to topic {}: {}", topic, e);
                    summary.failures += 1;
                }
            }
            _ => {
                for chunk in topics.chunks(MAX_CONDITION_TOPICS) {
                    let condition = condition_for(chunk, &self.topic_prefix);
                    summary.calls += 1;
                    if let Err(e) = self.gateway.send_to_condition(&condition, message).await {
                        tracing::warn!("Failed to send to condition [{}]: {}", condition, e);
                        summary.failures += 1;
                    }
                }
            }
        }

        summary
    }
}
