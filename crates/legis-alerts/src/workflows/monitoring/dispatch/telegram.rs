use std::time::Duration;

use serde::Serialize;

use super::render::render_rich;
use super::{Channel, ChannelError, ChannelKind, Message};

const API_BASE: &str = "https://api.telegram.org";

/// Real-time channel backed by the Telegram Bot API.
/// Errors are stripped of their URL, which embeds the bot token.
pub struct TelegramChannel {
    http: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

impl TelegramChannel {
    pub fn new(bot_token: &str, chat_id: &str, timeout: Duration) -> Result<Self, ChannelError> {
        Self::with_api_base(API_BASE, bot_token, chat_id, timeout)
    }

    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{bot_token}/sendMessage",
                api_base.trim_end_matches('/')
            ),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::RealTime
    }

    async fn deliver(&self, message: &Message) -> Result<(), ChannelError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: render_rich(message),
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        self.http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(reqwest::Error::without_url)?;
        Ok(())
    }
}
