use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::{NotifyError, NotifyEvent, Notifier};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

/// Posts each event to a Telegram chat through the Bot API
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        Self::with_api_base(API_BASE, bot_token, chat_id)
    }

    fn with_api_base(api_base: &str, bot_token: &str, chat_id: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base, bot_token),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    /// The endpoint path carries the bot token; keep it out of error text
    fn redact(&self, message: String) -> String {
        if self.bot_token.is_empty() {
            message
        } else {
            message.replace(&self.bot_token, "***")
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: event.render(),
            disable_web_page_preview: true,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(self.redact(e.without_url().to_string())))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(
                self.redact(format!("{}: {}", status, detail)),
            ));
        }

        tracing::debug!(kind = event.kind(), "Telegram notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_embeds_token() {
        let n = TelegramNotifier::new("123:abc", "-100200").unwrap();
        assert_eq!(n.endpoint, "https://api.telegram.org/bot123:abc/sendMessage");
        assert_eq!(n.chat_id, "-100200");
    }

    #[tokio::test]
    async fn test_transport_error_hides_token() {
        let token = "987654:SECRET-token";
        let n = TelegramNotifier::with_api_base("http://127.0.0.1:1", token, "-100200").unwrap();
        let event = NotifyEvent::ReconciliationAlert {
            message: "drift".into(),
        };

        let err = n.send(&event).await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
        assert!(!err.to_string().contains(token));
        assert!(!format!("{:?}", err).contains("SECRET"));
    }

    #[test]
    fn test_redact_masks_token() {
        let n = TelegramNotifier::new("123:abc", "-100200").unwrap();
        assert_eq!(
            n.redact("POST /bot123:abc/sendMessage failed".into()),
            "POST /bot***/sendMessage failed"
        );
    }
}
