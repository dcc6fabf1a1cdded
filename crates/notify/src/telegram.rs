use async_trait::async_trait;
use plotin_core::notify::error::NotifyError;
use plotin_core::notify::port::Notifier;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// # Summary
/// A notifier implementation that sends plain-text alerts via Telegram Bot API.
///
/// # Invariants
/// * `bot_token` must be valid.
/// * `chat_id` must be accessible by the bot.
pub struct TelegramNotifier {
    /// The Bot API token.
    bot_token: String,
    /// The target Chat ID.
    chat_id: String,
    /// Base URL of the Bot API, overridable for tests.
    api_base: String,
    /// The HTTP client used for requests.
    client: Client,
}

/// # Summary
/// Payload structure for Telegram `sendMessage` API.
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    /// # Summary
    /// Creates a new `TelegramNotifier`.
    ///
    /// # Logic
    /// Rejects empty credentials, then builds an HTTP client with a 15 second timeout.
    ///
    /// # Arguments
    /// * `bot_token` - The Telegram Bot API token.
    /// * `chat_id` - The target chat ID to send messages to.
    ///
    /// # Returns
    /// * `Ok(TelegramNotifier)` on success.
    /// * `Err(NotifyError::Config)` if a credential is empty or the client cannot be built.
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() {
            return Err(NotifyError::Config("Telegram bot token is empty".into()));
        }
        if chat_id.trim().is_empty() {
            return Err(NotifyError::Config("Telegram chat ID is empty".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;
        info!("Telegram notifier initialized");
        Ok(Self {
            bot_token,
            chat_id,
            api_base: TELEGRAM_API.to_string(),
            client,
        })
    }

    /// Points the notifier at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// # Summary
    /// Sends a plain-text alert to the configured Telegram chat.
    ///
    /// # Logic
    /// 1. Posts the message to `sendMessage` without a parse mode, so symbols and
    ///    percentages in the alert are not interpreted as markup.
    /// 2. Maps transport failures to `Network` and non-2xx responses to `Platform`.
    ///
    /// # Arguments
    /// * `message` - The alert body.
    ///
    /// # Returns
    /// * `Ok(())` if the message was sent successfully.
    /// * `Err(NotifyError)` otherwise.
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text: message,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Telegram API error ({}): {}",
                status, error_text
            )));
        }

        info!("Message sent to Telegram chat {}", self.chat_id);
        Ok(())
    }
}
