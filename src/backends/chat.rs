//! The chat-room backend.
//!
//! Sends an alert to a chat room via the service's HTTP API. A non-empty
//! summary goes out first as a short preliminary message, followed by a
//! pause so the two posts render in order, then the full body. Plain-text
//! content has the `8)` sequence neutralized so the remote service's
//! auto-emoticon formatting cannot corrupt it.

use crate::alert::Alert;
use crate::backends::log_snippet;
use crate::context::DispatchContext;
use crate::severity::{self, ChatColor, Severity};
use anyhow::{bail, Result};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Character cap on a posted body; the remote service hard-limits messages
/// at 10,000 characters, so leave headroom.
const CHAT_MAX_CHARS: usize = 9000;

/// Message rendering mode understood by the chat API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Text,
    Html,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
        }
    }
}

/// One message posted to a chat room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMessage {
    pub room_id: String,
    pub from: String,
    pub message: String,
    pub format: MessageFormat,
    pub notify: bool,
    pub color: ChatColor,
}

/// A client that can post a message to a chat room.
pub trait ChatApi: Send + Sync {
    /// Posts one message; a non-2xx response from the service is a failure.
    fn post_message(&self, token: &str, message: &RoomMessage) -> Result<()>;
}

/// The production `ChatApi`: a blocking HTTP client posting form-encoded
/// messages to the chat service.
pub struct HttpChatClient {
    api_url: String,
    client: reqwest::blocking::Client,
}

impl HttpChatClient {
    pub fn new(api_url: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        Self { api_url, client }
    }
}

impl ChatApi for HttpChatClient {
    fn post_message(&self, token: &str, message: &RoomMessage) -> Result<()> {
        let params = [
            ("room_id", message.room_id.as_str()),
            ("from", message.from.as_str()),
            ("message", message.message.as_str()),
            ("message_format", message.format.as_str()),
            ("notify", if message.notify { "1" } else { "0" }),
            ("color", message.color.as_str()),
            ("auth_token", token),
        ];
        let response = self.client.post(&self.api_url).form(&params).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("chat API returned {status}: {body}");
        }
        Ok(())
    }
}

/// Neutralizes the `8)` sequence with a zero-width space so the chat
/// service does not replace it with an emoticon. E.g. `(128)` would
/// otherwise render with a sunglasses head in it.
fn neutralize_auto_format(text: &str) -> String {
    text.replace("8)", "8\u{200B})")
}

impl Alert {
    /// Sends the alert to a chat room.
    ///
    /// `color` defaults from the alert's severity; `notify` (the audible
    /// flag) defaults to true only for `Critical`; `sender` defaults from
    /// configuration. Failures are logged, never raised, so the call always
    /// chains.
    pub fn send_to_chat(
        &mut self,
        ctx: &DispatchContext,
        room: &str,
        color: Option<ChatColor>,
        notify: Option<bool>,
        sender: Option<&str>,
    ) -> &mut Self {
        if !self.rate_limiter.allowed("chat") {
            return self;
        }

        let color = color.unwrap_or_else(|| *severity::color_map().resolve(self.severity()));
        let notify = notify.unwrap_or(self.severity() == Severity::Critical);
        let sender = sender.unwrap_or(&ctx.config().chat.sender);
        let summary = self.display_summary();

        if ctx.simulated() {
            info!(room, "would send to chat room: {}", self.message());
            return self;
        }

        let Some(token) = ctx.config().chat.token.as_deref() else {
            warn!(
                room,
                "not sending to chat (no auth token configured): {}",
                log_snippet(self.message())
            );
            return self;
        };

        if !summary.is_empty() {
            let preliminary = RoomMessage {
                room_id: room.to_string(),
                from: sender.to_string(),
                message: neutralize_auto_format(&summary),
                format: MessageFormat::Text,
                notify: false,
                color,
            };
            if let Err(err) = ctx.chat_api().post_message(token, &preliminary) {
                error!(room, "failed sending summary to chat: {err:#}");
            }
            // Back-to-back posts sometimes swap order en route to the chat
            // service; give the summary a head start.
            thread::sleep(Duration::from_millis(ctx.config().chat.summary_pause_ms));
        }

        let body: String = if self.message().chars().count() > CHAT_MAX_CHARS {
            self.message().chars().take(CHAT_MAX_CHARS).collect()
        } else {
            self.message().to_string()
        };
        let (message, format) = if self.is_html() {
            (body, MessageFormat::Html)
        } else {
            (neutralize_auto_format(&body), MessageFormat::Text)
        };
        let post = RoomMessage {
            room_id: room.to_string(),
            from: sender.to_string(),
            message,
            format,
            notify,
            color,
        };
        if let Err(err) = ctx.chat_api().post_message(token, &post) {
            error!(
                room,
                "failed sending to chat: {err:#} (message: {})",
                log_snippet(self.message())
            );
        }

        self
    }
}
