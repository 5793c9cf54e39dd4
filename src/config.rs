//! Configuration for the dispatcher.
//!
//! This module defines the `Config` struct and its per-backend sub-structs.
//! It uses the `figment` crate to layer an optional TOML file and
//! `ALERTKIT_`-prefixed environment variables over built-in defaults.
//! Credentials (the chat auth token, the metrics API key) live here as plain
//! optional fields: their absence is a handled state, not an error, and the
//! affected backend skips its dispatch with a logged warning.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The main configuration struct for the dispatcher.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Configuration for the chat backend.
    pub chat: ChatConfig,
    /// Configuration for the email backend and its delivery chain.
    pub email: EmailConfig,
    /// Configuration for the on-call paging backend.
    pub paging: PagingConfig,
    /// Configuration for the metrics counter backend.
    pub metrics: MetricsConfig,
}

/// Configuration for the chat backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    /// The chat service's message-post endpoint.
    pub api_url: String,
    /// Auth token for the chat API. When absent, chat dispatches are
    /// skipped with a warning.
    pub token: Option<String>,
    /// Default sender name shown on chat messages.
    pub sender: String,
    /// Pause between the preliminary summary message and the body, so the
    /// remote service renders them in order.
    pub summary_pause_ms: u64,
}

/// Configuration for the email backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailConfig {
    /// The single organizational domain recipients are scoped to.
    pub domain: String,
    /// Display name used in the synthesized sender address.
    pub sender_name: String,
    /// Endpoint of the managed platform mail API. When absent, that
    /// delivery strategy is unavailable and delivery falls through to the
    /// local SMTP relay.
    pub mail_api_url: Option<String>,
    /// Host of the local SMTP relay fallback.
    pub relay_host: String,
    /// Port of the local SMTP relay fallback.
    pub relay_port: u16,
}

/// Configuration for the paging backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PagingConfig {
    /// Domain suffix of the paging service's email integration.
    pub domain: String,
}

/// Configuration for the metrics counter backend.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricsConfig {
    /// API key prefixed onto every statistic name. When absent, metrics
    /// dispatches are skipped with a warning.
    pub api_key: Option<String>,
    /// Default `host:port` of the metrics collector.
    pub endpoint: String,
    /// How long a cached collector connection may be reused before it is
    /// torn down and re-resolved.
    pub connection_max_age_seconds: u64,
}

impl Config {
    /// Loads the configuration by layering sources: built-in defaults, an
    /// optional TOML file, and `ALERTKIT_`-prefixed environment variables
    /// (nested keys separated by `__`, e.g. `ALERTKIT_CHAT__TOKEN`).
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            .merge(Env::prefixed("ALERTKIT_").split("__"))
            .extract()?;
        Ok(config)
    }
}

// Defaults mirror the production constants; tests and embedders start from
// these and override what they need.
impl Default for Config {
    fn default() -> Self {
        Self {
            chat: ChatConfig {
                api_url: "https://api.hipchat.com/v1/rooms/message".to_string(),
                token: None,
                sender: "AlertiGator".to_string(),
                summary_pause_ms: 1000,
            },
            email: EmailConfig {
                domain: "khanacademy.org".to_string(),
                sender_name: "alertkit".to_string(),
                mail_api_url: None,
                relay_host: "localhost".to_string(),
                relay_port: 25,
            },
            paging: PagingConfig {
                domain: "khan-academy.pagerduty.com".to_string(),
            },
            metrics: MetricsConfig {
                api_key: None,
                endpoint: "carbon.hostedgraphite.com:2003".to_string(),
                connection_max_age_seconds: 600,
            },
        }
    }
}
