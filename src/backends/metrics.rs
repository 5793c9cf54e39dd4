//! The metrics counter backend.
//!
//! Sends `<api_key>.<statistic> <value>\n` lines to a metrics collector
//! over a persistent TCP connection drawn from the context's connection
//! cache. TCP rather than UDP: marking failures should be more reliable
//! than the failures themselves.

use crate::alert::Alert;
use crate::context::DispatchContext;
use tracing::{error, info, warn};

/// Renders a value for the wire: integral values as integer literals
/// (`12.0` goes out as `12`), everything else in decimal form.
pub(crate) fn format_value(value: f64) -> String {
    if value.is_finite() && value == value.trunc() {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

impl Alert {
    /// Sends `value` for the given dotted statistic name (e.g.
    /// `myapp.stats.num_failures`) to the default collector endpoint.
    pub fn send_to_metrics(
        &mut self,
        ctx: &DispatchContext,
        statistic: &str,
        value: f64,
    ) -> &mut Self {
        let endpoint = ctx.config().metrics.endpoint.clone();
        self.send_to_metrics_endpoint(ctx, statistic, value, &endpoint)
    }

    /// Like [`send_to_metrics`](Self::send_to_metrics), but targeting a
    /// specific `host:port` collector endpoint.
    pub fn send_to_metrics_endpoint(
        &mut self,
        ctx: &DispatchContext,
        statistic: &str,
        value: f64,
        endpoint: &str,
    ) -> &mut Self {
        if !self.rate_limiter.allowed("metrics") {
            return self;
        }

        let rendered = format_value(value);

        if ctx.simulated() {
            info!(statistic, value = %rendered, "would send to metrics");
            return self;
        }

        let Some(api_key) = ctx.config().metrics.api_key.clone() else {
            warn!(
                statistic,
                value = %rendered,
                "not sending to metrics (no API key configured)"
            );
            return self;
        };

        let line = format!("{api_key}.{statistic} {rendered}\n");
        if let Err(err) = ctx.connections().write_line(endpoint, line.as_bytes()) {
            error!(endpoint, statistic, "failed sending to metrics: {err:#}");
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Read;
    use std::net::TcpListener;
    use std::time::Duration;

    fn context_with_key(api_key: Option<&str>) -> DispatchContext {
        let mut config = Config::default();
        config.metrics.api_key = api_key.map(str::to_string);
        DispatchContext::new(config)
    }

    #[test]
    fn test_format_value_integral_values_as_integers() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(-3.0), "-3");
    }

    #[test]
    fn test_format_value_fractional_values_keep_decimals() {
        assert_eq!(format_value(12.5), "12.5");
        assert_eq!(format_value(-0.25), "-0.25");
    }

    #[test]
    fn test_sends_prefixed_line_to_collector() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let ctx = context_with_key(Some("key"));

        Alert::new("boom").send_to_metrics_endpoint(&ctx, "errors.count", 12.0, &endpoint);

        let (mut stream, _) = listener.accept().unwrap();
        let expected = b"key.errors.count 12\n";
        let mut buf = vec![0u8; expected.len()];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_missing_api_key_opens_no_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let ctx = context_with_key(None);

        Alert::new("boom").send_to_metrics_endpoint(&ctx, "errors.count", 1.0, &endpoint);

        listener.set_nonblocking(true).unwrap();
        assert!(listener.accept().is_err(), "no connection expected");
    }

    #[test]
    fn test_simulation_opens_no_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let ctx = context_with_key(Some("key"));
        ctx.enter_simulation();

        Alert::new("boom").send_to_metrics_endpoint(&ctx, "errors.count", 1.0, &endpoint);

        listener.set_nonblocking(true).unwrap();
        assert!(listener.accept().is_err(), "no connection expected");
    }

    #[test]
    fn test_transport_failure_does_not_panic_and_chains() {
        // Nothing is listening on this endpoint once the listener is
        // dropped; the failure must be absorbed.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        drop(listener);
        let ctx = context_with_key(Some("key"));

        Alert::new("boom")
            .send_to_metrics_endpoint(&ctx, "errors.count", 1.0, &endpoint)
            .send_to_metrics_endpoint(&ctx, "errors.count", 2.0, &endpoint);
    }

    #[test]
    fn test_rate_limit_gates_repeat_dispatch() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        let ctx = context_with_key(Some("key"));

        let mut alert = Alert::new("boom").with_rate_limit(Duration::from_secs(3600));
        alert.send_to_metrics_endpoint(&ctx, "hits", 1.0, &endpoint);
        alert.send_to_metrics_endpoint(&ctx, "hits", 1.0, &endpoint);

        let (mut stream, _) = listener.accept().unwrap();
        let expected = b"key.hits 1\n";
        let mut buf = vec![0u8; expected.len()];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(buf, expected);
        // A second payload would have arrived on the same cached stream.
        stream.set_nonblocking(true).unwrap();
        let mut rest = Vec::new();
        assert!(stream.read_to_end(&mut rest).is_err() || rest.is_empty());
    }
}
