use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::gateway::PushGateway;
use crate::message::{DeliveryReport, PushMessage};
use crate::PushError;

/// Connection settings for [`HttpGateway`].
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL of the push relay, e.g. `https://push.internal/v1`.
    pub endpoint: String,
    /// Sent as a bearer token when non-empty.
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Target<'a> {
    Topic(&'a str),
    Condition(&'a str),
    User(i64),
}

#[derive(Serialize)]
struct SendRequest<'a> {
    target: Target<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<&'a PushMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a BTreeMap<String, String>>,
    /// Background delivery: content-available, low priority, no alert.
    silent: bool,
}

/// Push gateway reached over a JSON/HTTP relay.
///
/// Every request is bounded by the configured timeout so a stuck relay
/// cannot block a fan-out run.
pub struct HttpGateway {
    client: Client,
    config: HttpGatewayConfig,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> crate::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn post(&self, request: &SendRequest<'_>) -> crate::Result<reqwest::Response> {
        let url = format!("{}/send", self.config.endpoint.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl PushGateway for HttpGateway {
    async fn send_to_topic(&self, topic: &str, message: &PushMessage) -> crate::Result<()> {
        self.post(&SendRequest {
            target: Target::Topic(topic),
            notification: Some(message),
            data: None,
            silent: false,
        })
        .await?;
        Ok(())
    }

    async fn send_to_condition(
        &self,
        condition: &str,
        message: &PushMessage,
    ) -> crate::Result<()> {
        self.post(&SendRequest {
            target: Target::Condition(condition),
            notification: Some(message),
            data: None,
            silent: false,
        })
        .await?;
        Ok(())
    }

    async fn send_to_user(
        &self,
        user_id: i64,
        message: &PushMessage,
    ) -> crate::Result<DeliveryReport> {
        let response = self
            .post(&SendRequest {
                target: Target::User(user_id),
                notification: Some(message),
                data: None,
                silent: false,
            })
            .await?;
        Ok(response.json::<DeliveryReport>().await?)
    }

    async fn send_silent_to_user(
        &self,
        user_id: i64,
        data: &BTreeMap<String, String>,
    ) -> crate::Result<()> {
        self.post(&SendRequest {
            target: Target::User(user_id),
            notification: None,
            data: Some(data),
            silent: true,
        })
        .await?;
        Ok(())
    }
}
