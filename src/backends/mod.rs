//! The five notification backends.
//!
//! Each submodule adds `send_to_*` methods to [`crate::Alert`]. Every
//! dispatch independently checks the alert's rate limiter, formats the
//! message for its backend, and either performs the external call or, in
//! simulation mode, logs the intended effect. Transport failures are
//! absorbed and logged at the dispatcher boundary; only validation failures
//! (malformed recipients or service names) surface to the caller.

pub mod chat;
pub mod email;
pub mod logs;
pub mod metrics;
pub mod paging;

/// A bounded excerpt of message content, for failure diagnostics.
pub(crate) fn log_snippet(text: &str) -> String {
    const MAX_CHARS: usize = 200;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let mut snippet: String = text.chars().take(MAX_CHARS).collect();
        snippet.push_str("...");
        snippet
    }
}
