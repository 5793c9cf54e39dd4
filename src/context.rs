//! The injectable runtime context shared by every dispatcher.
//!
//! Everything that outlives a single `Alert` lives here: the simulation-mode
//! flag, the chat API client, the ordered email delivery chain, the OS
//! syslog handle, and the cache of persistent metrics connections. Keeping
//! this state on an explicit context (rather than process-wide globals)
//! keeps the dispatchers testable: tests swap in fake clients with
//! [`DispatchContext::with_chat_api`] and
//! [`DispatchContext::with_mail_transports`].

use crate::backends::chat::{ChatApi, HttpChatClient};
use crate::backends::email::{HttpMailApi, MailTransport, SmtpRelay};
use crate::backends::logs::SyslogWriter;
use crate::config::Config;
use anyhow::{Context as _, Result};
use std::collections::HashMap;
use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Runtime state consulted by every dispatch call.
pub struct DispatchContext {
    config: Config,
    simulation: AtomicBool,
    chat_api: Box<dyn ChatApi>,
    mail_chain: Vec<Box<dyn MailTransport>>,
    syslog: SyslogWriter,
    connections: ConnectionCache,
}

impl DispatchContext {
    /// Builds a context from configuration: an HTTP chat client, a mail
    /// delivery chain (managed mail API when configured, then the local SMTP
    /// relay), and an empty metrics connection cache.
    pub fn new(config: Config) -> Self {
        let chat_api: Box<dyn ChatApi> =
            Box::new(HttpChatClient::new(config.chat.api_url.clone()));
        let mut mail_chain: Vec<Box<dyn MailTransport>> = Vec::new();
        if let Some(url) = &config.email.mail_api_url {
            mail_chain.push(Box::new(HttpMailApi::new(url.clone())));
        }
        mail_chain.push(Box::new(SmtpRelay::new(
            config.email.relay_host.clone(),
            config.email.relay_port,
        )));
        let connections =
            ConnectionCache::new(Duration::from_secs(config.metrics.connection_max_age_seconds));
        Self {
            config,
            simulation: AtomicBool::new(false),
            chat_api,
            mail_chain,
            syslog: SyslogWriter::new(),
            connections,
        }
    }

    /// Replaces the chat API client. Used by tests and by embedders with
    /// their own transport.
    pub fn with_chat_api(mut self, api: Box<dyn ChatApi>) -> Self {
        self.chat_api = api;
        self
    }

    /// Replaces the email delivery chain. Transports are tried in order
    /// until one delivers.
    pub fn with_mail_transports(mut self, chain: Vec<Box<dyn MailTransport>>) -> Self {
        self.mail_chain = chain;
        self
    }

    /// Enters simulation mode: dispatchers log what they would do instead of
    /// performing any external call.
    pub fn enter_simulation(&self) {
        self.simulation.store(true, Ordering::SeqCst);
    }

    /// Exits simulation mode and resumes performing operations.
    pub fn exit_simulation(&self) {
        self.simulation.store(false, Ordering::SeqCst);
    }

    /// Whether simulation mode is active.
    pub fn simulated(&self) -> bool {
        self.simulation.load(Ordering::SeqCst)
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn chat_api(&self) -> &dyn ChatApi {
        self.chat_api.as_ref()
    }

    pub(crate) fn mail_transports(&self) -> &[Box<dyn MailTransport>] {
        &self.mail_chain
    }

    pub(crate) fn syslog(&self) -> &SyslogWriter {
        &self.syslog
    }

    pub(crate) fn connections(&self) -> &ConnectionCache {
        &self.connections
    }
}

/// Cache of persistent stream connections to metrics collectors, keyed by
/// `host:port` endpoint.
///
/// Connections are created lazily and replaced once they exceed the
/// configured age, which bounds the staleness of any cached name resolution.
/// The check-then-recreate sequence runs under one lock so concurrent
/// callers observe either the old or the new connection, never a
/// half-constructed one.
pub(crate) struct ConnectionCache {
    max_age: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

struct CacheEntry {
    stream: TcpStream,
    created_at: Instant,
}

impl ConnectionCache {
    pub(crate) fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Writes `payload` over the cached connection for `endpoint`, creating
    /// or replacing the connection first if absent or past its age limit.
    ///
    /// A connect failure leaves no cache entry behind, so the next call
    /// retries from scratch. A write failure keeps the connection; there is
    /// no in-call retry.
    pub(crate) fn write_line(&self, endpoint: &str, payload: &[u8]) -> Result<()> {
        self.write_line_at(endpoint, payload, Instant::now())
    }

    pub(crate) fn write_line_at(&self, endpoint: &str, payload: &[u8], now: Instant) -> Result<()> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let stale = entries
            .get(endpoint)
            .is_none_or(|entry| now.duration_since(entry.created_at) > self.max_age);
        if stale {
            if entries.remove(endpoint).is_some() {
                debug!(endpoint, "replacing aged-out metrics connection");
            }
            let stream = TcpStream::connect(endpoint)
                .with_context(|| format!("connecting to metrics collector at {endpoint}"))?;
            entries.insert(
                endpoint.to_string(),
                CacheEntry {
                    stream,
                    created_at: now,
                },
            );
        }

        if let Some(entry) = entries.get_mut(endpoint) {
            entry
                .stream
                .write_all(payload)
                .with_context(|| format!("writing to metrics collector at {endpoint}"))?;
        }
        Ok(())
    }
}
