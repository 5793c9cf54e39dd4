//! The email backend and its two-tier delivery chain.
//!
//! Recipients are bare usernames scoped to a single organizational domain;
//! anything that already looks like a full address is a programmer error and
//! is rejected. Delivery walks an ordered chain of transports: the managed
//! platform mail API when one is configured, then the local SMTP relay. A
//! transport that is *unavailable* (not present in this environment) passes
//! the attempt to the next one; a transport that is configured but *fails*
//! ends the chain, since masking a real delivery failure behind a fallback
//! would hide the problem.

use crate::alert::{Alert, AlertError};
use crate::context::DispatchContext;
use anyhow::{anyhow, Context as _, Result};
use lettre::message::header::ContentType;
use lettre::{Message, SmtpTransport, Transport};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

/// The result of one transport's delivery attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The message was handed off to this transport.
    Delivered,
    /// This transport is not present or reachable in this environment; the
    /// next transport in the chain should be tried.
    Unavailable(String),
    /// The transport is present but delivery failed; the chain stops.
    Failed(anyhow::Error),
}

/// A fully composed message, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMail {
    pub subject: String,
    pub sender: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// The plain-text body, normalized to end with exactly one newline.
    pub body: String,
    /// Present when the alert is HTML; transports that can, send this form.
    pub html_body: Option<String>,
}

/// One delivery strategy in the fallback chain.
pub trait MailTransport: Send + Sync {
    /// A short name for logging ("mail-api", "smtp-relay").
    fn name(&self) -> &'static str;

    /// Attempts delivery, reporting delivered, unavailable, or failed.
    fn deliver(&self, mail: &ComposedMail) -> DeliveryOutcome;
}

/// The managed platform mail API: a blocking HTTP client posting the
/// composed message as JSON.
pub struct HttpMailApi {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpMailApi {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        Self { endpoint, client }
    }
}

impl MailTransport for HttpMailApi {
    fn name(&self) -> &'static str {
        "mail-api"
    }

    fn deliver(&self, mail: &ComposedMail) -> DeliveryOutcome {
        let mut payload = json!({
            "subject": mail.subject,
            "sender": mail.sender,
            "to": mail.to,
            "body": mail.body,
        });
        if !mail.cc.is_empty() {
            payload["cc"] = json!(mail.cc);
        }
        if !mail.bcc.is_empty() {
            payload["bcc"] = json!(mail.bcc);
        }
        if let Some(html) = &mail.html_body {
            payload["html_body"] = json!(html);
        }

        match self.client.post(&self.endpoint).json(&payload).send() {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    DeliveryOutcome::Delivered
                } else {
                    let body = response.text().unwrap_or_default();
                    DeliveryOutcome::Failed(anyhow!("mail API returned {status}: {body}"))
                }
            }
            Err(err) => DeliveryOutcome::Failed(err.into()),
        }
    }
}

/// The local SMTP relay fallback.
pub struct SmtpRelay {
    host: String,
    port: u16,
}

impl SmtpRelay {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    fn build_message(mail: &ComposedMail) -> Result<Message> {
        let mut builder = Message::builder()
            .from(mail.sender.parse().context("parsing sender address")?)
            .subject(mail.subject.clone());
        for to in &mail.to {
            builder = builder.to(to.parse().context("parsing recipient address")?);
        }
        for cc in &mail.cc {
            builder = builder.cc(cc.parse().context("parsing cc address")?);
        }
        for bcc in &mail.bcc {
            builder = builder.bcc(bcc.parse().context("parsing bcc address")?);
        }
        let message = if let Some(html) = &mail.html_body {
            builder
                .header(ContentType::TEXT_HTML)
                .body(html.clone())
                .context("building HTML message")?
        } else {
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(mail.body.clone())
                .context("building plain-text message")?
        };
        Ok(message)
    }
}

impl MailTransport for SmtpRelay {
    fn name(&self) -> &'static str {
        "smtp-relay"
    }

    fn deliver(&self, mail: &ComposedMail) -> DeliveryOutcome {
        let message = match Self::build_message(mail) {
            Ok(message) => message,
            Err(err) => return DeliveryOutcome::Failed(err),
        };
        let transport = SmtpTransport::builder_dangerous(&self.host)
            .port(self.port)
            .build();
        match transport.send(&message) {
            Ok(_) => DeliveryOutcome::Delivered,
            // An SMTP reply code means we reached a relay and it said no;
            // anything else means no relay is reachable here.
            Err(err) if err.is_permanent() || err.is_transient() => {
                DeliveryOutcome::Failed(anyhow!("relay rejected message: {err}"))
            }
            Err(err) => DeliveryOutcome::Unavailable(format!("relay unreachable: {err}")),
        }
    }
}

/// Walks the context's transport chain until one delivers. Unavailable
/// transports fall through quietly; a genuine failure stops the chain and
/// is logged.
pub(crate) fn deliver_via_chain(ctx: &DispatchContext, mail: &ComposedMail) {
    for transport in ctx.mail_transports() {
        match transport.deliver(mail) {
            DeliveryOutcome::Delivered => {
                debug!(transport = transport.name(), to = ?mail.to, "email delivered");
                return;
            }
            DeliveryOutcome::Unavailable(reason) => {
                debug!(
                    transport = transport.name(),
                    reason, "delivery path unavailable, trying next"
                );
            }
            DeliveryOutcome::Failed(err) => {
                error!(
                    transport = transport.name(),
                    to = ?mail.to,
                    subject = %mail.subject,
                    "failed sending email: {err:#}"
                );
                return;
            }
        }
    }
    error!(to = ?mail.to, subject = %mail.subject, "no delivery path available for email");
}

/// Appends the organizational domain to each bare username, rejecting
/// anything that already carries an `@`.
pub(crate) fn normalize_recipients(
    names: &[&str],
    domain: &str,
) -> Result<Vec<String>, AlertError> {
    names
        .iter()
        .map(|name| {
            if name.contains('@') {
                Err(AlertError::InvalidRecipient((*name).to_string()))
            } else {
                Ok(format!("{name}@{domain}"))
            }
        })
        .collect()
}

/// Synthesizes the sender address: `name <no-reply[+tag]@domain>`, with the
/// tag's non-word characters replaced by `-`.
pub(crate) fn sender_address(sender_name: &str, domain: &str, tag: Option<&str>) -> String {
    let mut local = String::from("no-reply");
    if let Some(tag) = tag.filter(|tag| !tag.is_empty()) {
        let cleaned: String = tag
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '-' })
            .collect();
        local.push('+');
        local.push_str(&cleaned);
    }
    format!("{sender_name} <{local}@{domain}>")
}

impl Alert {
    /// Sends the alert as email to usernames on the organizational domain.
    ///
    /// The subject is the alert's (explicit or derived) summary.
    /// `sender_tag`, when given, becomes part of the sender address so
    /// replies and filters can tell alert sources apart. Returns an error
    /// only for malformed recipients; delivery failures are logged.
    pub fn send_to_email(
        &mut self,
        ctx: &DispatchContext,
        usernames: &[&str],
        cc: &[&str],
        bcc: &[&str],
        sender_tag: Option<&str>,
    ) -> Result<&mut Self, AlertError> {
        if !self.rate_limiter.allowed("email") {
            return Ok(self);
        }

        let email_cfg = &ctx.config().email;
        let to = normalize_recipients(usernames, &email_cfg.domain)?;
        let cc = normalize_recipients(cc, &email_cfg.domain)?;
        let bcc = normalize_recipients(bcc, &email_cfg.domain)?;
        let sender = sender_address(&email_cfg.sender_name, &email_cfg.domain, sender_tag);
        let mail = self.compose_mail(to, cc, bcc, sender);

        if ctx.simulated() {
            info!(
                to = ?mail.to,
                cc = ?mail.cc,
                bcc = ?mail.bcc,
                from = %mail.sender,
                subject = %mail.subject,
                "would send email: {}",
                mail.body
            );
            return Ok(self);
        }

        deliver_via_chain(ctx, &mail);
        Ok(self)
    }

    /// Composes the wire-ready mail for this alert: subject from the
    /// summary, body normalized to one trailing newline, HTML form attached
    /// when the alert is HTML.
    pub(crate) fn compose_mail(
        &self,
        to: Vec<String>,
        cc: Vec<String>,
        bcc: Vec<String>,
        sender: String,
    ) -> ComposedMail {
        let body = format!("{}\n", self.message().trim_end_matches('\n'));
        ComposedMail {
            subject: self.display_summary(),
            sender,
            to,
            cc,
            bcc,
            html_body: self.is_html().then(|| body.clone()),
            body,
        }
    }
}
