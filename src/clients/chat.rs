//! Outbound delivery of turn alerts to the chat platform.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::join_segments;

/// Failures while delivering a chat message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request could not be sent.
    #[error("failed to post message to channel `{channel_id}`")]
    Request {
        /// Target channel.
        channel_id: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The platform rejected the message.
    #[error("chat platform answered {status} for channel `{channel_id}`")]
    Status {
        /// Target channel.
        channel_id: String,
        /// Returned status.
        status: StatusCode,
    },
    /// No answer within the allotted time.
    #[error("delivery to channel `{channel_id}` timed out after {timeout:?}")]
    Timeout {
        /// Target channel.
        channel_id: String,
        /// Time allowed for the delivery.
        timeout: Duration,
    },
}

/// Outbound message to post in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Destination channel.
    pub channel_id: String,
    /// Message body, mention included.
    pub content: String,
    /// Users the message is allowed to ping.
    pub mentions: Vec<String>,
}

/// Delivery side of the chat platform.
pub trait ChatGateway: Send + Sync {
    /// Post `message` in its channel.
    fn send(&self, message: ChatMessage) -> BoxFuture<'static, Result<(), DeliveryError>>;
}

/// Mention syntax understood by the chat platform.
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

#[derive(Serialize)]
struct CreateMessageBody<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions<'a>,
}

#[derive(Serialize)]
struct AllowedMentions<'a> {
    parse: [&'a str; 0],
    users: &'a [String],
}

/// [`ChatGateway`] posting through the platform's bot REST API.
#[derive(Clone)]
pub struct BotApiChat {
    client: Client,
    api_base_url: String,
    token: String,
}

impl BotApiChat {
    /// Build a client for `api_base_url` authenticated with the bot `token`.
    pub fn new(api_base_url: &str, token: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    fn messages_url(&self, channel_id: &str) -> String {
        join_segments(&self.api_base_url, ["channels", channel_id, "messages"])
    }
}

impl ChatGateway for BotApiChat {
    fn send(&self, message: ChatMessage) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let chat = self.clone();
        Box::pin(async move {
            let body = CreateMessageBody {
                content: &message.content,
                allowed_mentions: AllowedMentions {
                    parse: [],
                    users: &message.mentions,
                },
            };

            let response = chat
                .client
                .post(chat.messages_url(&message.channel_id))
                .header(
                    reqwest::header::AUTHORIZATION,
                    format!("Bot {}", chat.token),
                )
                .json(&body)
                .send()
                .await
                .map_err(|source| DeliveryError::Request {
                    channel_id: message.channel_id.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(DeliveryError::Status {
                    channel_id: message.channel_id.clone(),
                    status: response.status(),
                })
            }
        })
    }
}

/// [`ChatGateway`] that only logs messages, for runs without bot credentials.
#[derive(Debug, Clone, Default)]
pub struct LogOnlyChat;

impl ChatGateway for LogOnlyChat {
    fn send(&self, message: ChatMessage) -> BoxFuture<'static, Result<(), DeliveryError>> {
        Box::pin(async move {
            info!(
                channel_id = %message.channel_id,
                content = %message.content,
                "chat delivery disabled; logging alert instead"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_body_only_allows_listed_users() {
        let mentions = vec!["200".to_string()];
        let body = CreateMessageBody {
            content: "<@200> your turn",
            allowed_mentions: AllowedMentions {
                parse: [],
                users: &mentions,
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["content"], "<@200> your turn");
        assert_eq!(value["allowed_mentions"]["parse"], serde_json::json!([]));
        assert_eq!(value["allowed_mentions"]["users"], serde_json::json!(["200"]));
    }

    #[test]
    fn messages_url_targets_channel() {
        let chat = BotApiChat::new(
            "https://chat.test/api/v10/",
            "token".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            chat.messages_url("123"),
            "https://chat.test/api/v10/channels/123/messages"
        );
        assert_eq!(
            chat.messages_url("12/../34"),
            "https://chat.test/api/v10/channels/12%2F..%2F34/messages"
        );
    }

    #[tokio::test]
    async fn log_only_chat_always_succeeds() {
        let message = ChatMessage {
            channel_id: "chan".into(),
            content: "hello".into(),
            mentions: Vec::new(),
        };
        assert!(LogOnlyChat.send(message).await.is_ok());
    }
}
