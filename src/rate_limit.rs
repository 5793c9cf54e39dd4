//! Per-alert, per-backend rate limiting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Suppresses repeated dispatches of one alert to the same backend within a
/// time window.
///
/// The limiter is scoped to a single `Alert` instance: two alerts never share
/// state, and callers wanting cross-process rate limiting must coordinate
/// themselves. With no window configured, every dispatch is allowed and no
/// state is recorded.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    window: Option<Duration>,
    last_sent: HashMap<&'static str, Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given window, or an always-allow limiter
    /// when `window` is `None`.
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            window,
            last_sent: HashMap::new(),
        }
    }

    /// Checks whether a dispatch to `backend` may proceed, stamping the
    /// current time when it may.
    pub fn allowed(&mut self, backend: &'static str) -> bool {
        self.allowed_at(backend, Instant::now())
    }

    /// The clock-injected form of [`allowed`](Self::allowed).
    ///
    /// A backend never seen before counts as having been sent arbitrarily
    /// long ago. A denied attempt does not update the last-sent stamp.
    pub(crate) fn allowed_at(&mut self, backend: &'static str, now: Instant) -> bool {
        let Some(window) = self.window else {
            return true;
        };
        let within_window = self
            .last_sent
            .get(backend)
            .is_some_and(|last| now.duration_since(*last) <= window);
        if within_window {
            return false;
        }
        self.last_sent.insert(backend, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_window_always_allows() {
        let mut limiter = RateLimiter::new(None);
        assert!(limiter.allowed("chat"));
        assert!(limiter.allowed("chat"));
        assert!(limiter.last_sent.is_empty());
    }

    #[test]
    fn test_second_attempt_within_window_is_denied() {
        let mut limiter = RateLimiter::new(Some(Duration::from_secs(60)));
        let start = Instant::now();
        assert!(limiter.allowed_at("chat", start));
        assert!(!limiter.allowed_at("chat", start + Duration::from_secs(30)));
    }

    #[test]
    fn test_attempt_after_window_is_allowed() {
        let mut limiter = RateLimiter::new(Some(Duration::from_secs(60)));
        let start = Instant::now();
        assert!(limiter.allowed_at("chat", start));
        assert!(limiter.allowed_at("chat", start + Duration::from_secs(61)));
    }

    #[test]
    fn test_denied_attempt_does_not_reset_the_window() {
        let mut limiter = RateLimiter::new(Some(Duration::from_secs(60)));
        let start = Instant::now();
        assert!(limiter.allowed_at("chat", start));
        // A denied attempt halfway through must not push the window out.
        assert!(!limiter.allowed_at("chat", start + Duration::from_secs(40)));
        assert!(limiter.allowed_at("chat", start + Duration::from_secs(61)));
    }

    #[test]
    fn test_backends_are_limited_independently() {
        let mut limiter = RateLimiter::new(Some(Duration::from_secs(60)));
        let start = Instant::now();
        assert!(limiter.allowed_at("chat", start));
        assert!(limiter.allowed_at("email", start));
        assert!(!limiter.allowed_at("chat", start + Duration::from_secs(1)));
        assert!(!limiter.allowed_at("email", start + Duration::from_secs(1)));
    }
}
