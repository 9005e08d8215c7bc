//! Telegram Bot API transport.

use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;

use super::DeliveryTransport;
use crate::config::TelegramConfig;
use crate::error::TransportError;
use crate::RenderedDocument;

/// Telegram rejects document captions longer than this.
const MAX_CAPTION_CHARS: usize = 1024;

pub struct TelegramTransport {
    client: Client,
    /// `{api_base}/bot{token}`. Never logged.
    base: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramTransport {
    pub fn new(config: &TelegramConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
            .build()
            .map_err(transport_error)?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", config.api_base.trim_end_matches('/'), config.bot_token),
            chat_id: config.chat_id.clone(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }
}

impl DeliveryTransport for TelegramTransport {
    fn send_message(&self, text: &str) -> Result<(), TransportError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&body)
            .send()
            .map_err(transport_error)?;
        check(response)
    }

    fn send_document(&self, document: &RenderedDocument, caption: &str) -> Result<(), TransportError> {
        let part = multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name())
            .mime_str("application/pdf")
            .map_err(transport_error)?;
        let form = multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", truncate_caption(caption))
            .part("document", part);

        let response = self
            .client
            .post(self.endpoint("sendDocument"))
            .multipart(form)
            .send()
            .map_err(transport_error)?;
        check(response)
    }
}

fn check(response: Response) -> Result<(), TransportError> {
    let status = response.status();
    let body: Option<ApiResponse> = response.json().ok();
    match body {
        Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
        Some(ApiResponse { description, .. }) => Err(TransportError::Rejected {
            status: status.as_u16(),
            description: description.unwrap_or_else(|| status.to_string()),
        }),
        None => Err(TransportError::Rejected {
            status: status.as_u16(),
            description: "unreadable response body".to_string(),
        }),
    }
}

/// Map a reqwest error, stripping the URL so the bot token stays out of logs.
fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(e.without_url().to_string())
    }
}

fn truncate_caption(caption: &str) -> String {
    caption.chars().take(MAX_CAPTION_CHARS).collect()
}
