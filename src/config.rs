//! Process configuration.
//!
//! Loaded once at startup from an optional JSON file, then overridden by
//! `FATURA_*` environment variables. Credentials only ever live here and are
//! handed to the transport at construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::InvoiceSettings;
use crate::style::{Preset, StyleSheet};

pub const ENV_BOT_TOKEN: &str = "FATURA_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "FATURA_CHAT_ID";
pub const ENV_STYLE: &str = "FATURA_STYLE";
pub const ENV_FONT_DIR: &str = "FATURA_FONT_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub invoice: InvoiceSettings,
    /// Style preset name: `royal`, `emerald` or `charcoal`.
    pub style: String,
    /// Directory holding the preset's TTF files. Defaults to `./fonts`.
    pub font_dir: Option<PathBuf>,
    /// Upper bound on a single QR encode.
    pub qr_timeout_ms: u64,
    pub telegram: Option<TelegramConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            invoice: InvoiceSettings::default(),
            style: Preset::default().to_string(),
            font_dir: None,
            qr_timeout_ms: 2_000,
            telegram: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Read `path` (or start from defaults) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        tracing::debug!(style = %config.style, telegram = config.telegram.is_some(), "configuration loaded");
        Ok(config)
    }

    /// Override settings from `lookup`, which maps variable names to values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(style) = lookup(ENV_STYLE) {
            self.style = style;
        }
        if let Some(dir) = lookup(ENV_FONT_DIR) {
            self.font_dir = Some(PathBuf::from(dir));
        }
        let token = lookup(ENV_BOT_TOKEN);
        let chat = lookup(ENV_CHAT_ID);
        if token.is_some() || chat.is_some() {
            let telegram = self.telegram.get_or_insert_with(TelegramConfig::default);
            if let Some(token) = token {
                telegram.bot_token = token;
            }
            if let Some(chat) = chat {
                telegram.chat_id = chat;
            }
        }
    }

    pub fn preset(&self) -> Result<Preset, ConfigError> {
        self.style.parse()
    }

    /// The configured preset, with fonts looked up in `font_dir` if set.
    pub fn style_sheet(&self) -> Result<StyleSheet, ConfigError> {
        let sheet = StyleSheet::preset(self.preset()?);
        Ok(match &self.font_dir {
            Some(dir) => sheet.with_font_dir(dir),
            None => sheet,
        })
    }

    pub fn qr_timeout(&self) -> Duration {
        Duration::from_millis(self.qr_timeout_ms)
    }

    /// Telegram settings, required for sending.
    pub fn telegram(&self) -> Result<&TelegramConfig, ConfigError> {
        let telegram = self.telegram.as_ref().ok_or(ConfigError::Missing("telegram"))?;
        if telegram.bot_token.is_empty() {
            return Err(ConfigError::Missing("telegram.botToken"));
        }
        if telegram.chat_id.is_empty() {
            return Err(ConfigError::Missing("telegram.chatId"));
        }
        Ok(telegram)
    }
}
