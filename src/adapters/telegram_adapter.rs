//! Telegram Bot API notifier.

use crate::domain::error::SigtraderError;
use crate::ports::config_port::ConfigPort;
use crate::ports::notify_port::Notifier;
use std::time::Duration;

pub const API_BASE: &str = "https://api.telegram.org";
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> Result<Self, SigtraderError> {
        Self::with_base_url(API_BASE, token, chat_id)
    }

    pub fn with_base_url(base: &str, token: &str, chat_id: &str) -> Result<Self, SigtraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| SigtraderError::Notification {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", base.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        })
    }

    /// `None` unless both `[telegram] token` and `chat_id` are set.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Option<Self>, SigtraderError> {
        let token = config
            .get_string("telegram", "token")
            .filter(|s| !s.trim().is_empty());
        let chat_id = config
            .get_string("telegram", "chat_id")
            .filter(|s| !s.trim().is_empty());

        match (token, chat_id) {
            (Some(token), Some(chat_id)) => Self::new(token.trim(), chat_id.trim()).map(Some),
            _ => Ok(None),
        }
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, text: &str) -> Result<(), SigtraderError> {
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "Markdown"),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .map_err(|e| SigtraderError::Notification {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SigtraderError::Notification {
                reason: format!("telegram responded with {}", status),
            })
        }
    }
}
