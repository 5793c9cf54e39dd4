//! The `Alert` entity: one logical message, dispatched to any subset of
//! backends.
//!
//! An `Alert` is built once and then pushed at zero or more backends via the
//! `send_to_*` methods defined in [`crate::backends`]. Every dispatch method
//! returns the alert again so calls compose:
//!
//! ```no_run
//! use alertkit::{Alert, Config, DispatchContext, Severity};
//!
//! # fn main() -> Result<(), alertkit::AlertError> {
//! let ctx = DispatchContext::new(Config::default());
//! Alert::new("long-running task failed")
//!     .with_severity(Severity::Error)
//!     .send_to_chat(&ctx, "1s and 0s", None, None, None)
//!     .send_to_paging(&ctx, &["Infra Oncall"])?
//!     .send_to_logs(&ctx);
//! # Ok(())
//! # }
//! ```

use crate::rate_limit::RateLimiter;
use crate::severity::Severity;
use crate::summary;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the dispatch methods.
///
/// Only validation failures cross the dispatcher boundary: they indicate
/// programmer error and must not be swallowed. Transport and configuration
/// problems are absorbed and logged so one failing backend never stops a
/// chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// An email recipient already carried a full address; bare usernames
    /// are required.
    #[error("specify email usernames, not addresses ({0})")]
    InvalidRecipient(String),
    /// A paging target already carried a full address; service names are
    /// required.
    #[error("specify paging service names, not addresses ({0})")]
    InvalidServiceName(String),
}

/// An alert message that can be sent to multiple destinations.
#[derive(Debug, Clone)]
pub struct Alert {
    message: String,
    summary: Option<String>,
    severity: Severity,
    html: bool,
    pub(crate) rate_limiter: RateLimiter,
}

impl Alert {
    /// Creates an alert with the given message, `Info` severity, no explicit
    /// summary, plain-text formatting, and no rate limit.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            summary: None,
            severity: Severity::Info,
            html: false,
            rate_limiter: RateLimiter::default(),
        }
    }

    /// Sets an explicit summary (used as the email subject line, for
    /// instance). Without one, a short form is derived from the message at
    /// send time.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the alert's severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Marks the message as HTML rather than plain text.
    pub fn with_html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    /// Limits this alert to at most one dispatch per backend within the
    /// given window. The limit is scoped to this instance only.
    pub fn with_rate_limit(mut self, window: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(Some(window));
        self
    }

    /// The full message body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The explicitly supplied summary, if any.
    pub fn explicit_summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// The alert's severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the message body is HTML.
    pub fn is_html(&self) -> bool {
        self.html
    }

    /// The summary used at send time: the explicit one, or a derived short
    /// form. Never cached; recomputed per backend.
    pub fn display_summary(&self) -> String {
        summary::derive(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let alert = Alert::new("hello");
        assert_eq!(alert.message(), "hello");
        assert_eq!(alert.severity(), Severity::Info);
        assert!(alert.explicit_summary().is_none());
        assert!(!alert.is_html());
    }

    #[test]
    fn test_builder_setters() {
        let alert = Alert::new("body")
            .with_summary("subject")
            .with_severity(Severity::Critical)
            .with_html(true)
            .with_rate_limit(Duration::from_secs(5));
        assert_eq!(alert.explicit_summary(), Some("subject"));
        assert_eq!(alert.severity(), Severity::Critical);
        assert!(alert.is_html());
    }

    #[test]
    fn test_message_is_not_mutated_by_summary_derivation() {
        let alert = Alert::new("one. two\nthree");
        let _ = alert.display_summary();
        assert_eq!(alert.message(), "one. two\nthree");
    }
}
