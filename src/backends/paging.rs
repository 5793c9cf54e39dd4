//! The on-call paging backend.
//!
//! The paging service is addressed through its email integration: each
//! logical service name is canonicalized into a synthetic address the same
//! way the remote service does it (drop everything outside `[A-Za-z0-9._-]`,
//! lowercase, append the paging domain), then delivery rides the email
//! backend's transport chain.

use crate::alert::{Alert, AlertError};
use crate::backends::email::{deliver_via_chain, sender_address};
use crate::context::DispatchContext;
use tracing::info;

/// Converts a service name into the paging service's email address.
/// Names that already contain an `@` are rejected; callers must pass
/// service names, not addresses.
pub(crate) fn service_name_to_address(name: &str, domain: &str) -> Result<String, AlertError> {
    if name.contains('@') {
        return Err(AlertError::InvalidServiceName(name.to_string()));
    }
    let canonical: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    Ok(format!("{canonical}@{domain}"))
}

impl Alert {
    /// Sends an incident report to the given paging services.
    ///
    /// Returns an error only when a service name is malformed; delivery
    /// failures are logged and absorbed.
    pub fn send_to_paging(
        &mut self,
        ctx: &DispatchContext,
        service_names: &[&str],
    ) -> Result<&mut Self, AlertError> {
        if !self.rate_limiter.allowed("paging") {
            return Ok(self);
        }

        let domain = &ctx.config().paging.domain;
        let to = service_names
            .iter()
            .map(|name| service_name_to_address(name, domain))
            .collect::<Result<Vec<_>, _>>()?;

        let email_cfg = &ctx.config().email;
        let sender = sender_address(&email_cfg.sender_name, &email_cfg.domain, None);
        let mail = self.compose_mail(to, Vec::new(), Vec::new(), sender);

        if ctx.simulated() {
            info!(
                to = ?mail.to,
                subject = %mail.subject,
                "would send paging email: {}",
                mail.body
            );
            return Ok(self);
        }

        deliver_via_chain(ctx, &mail);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::email::{ComposedMail, DeliveryOutcome, MailTransport};
    use crate::config::Config;
    use std::sync::{Arc, Mutex};

    struct RecordingTransport {
        attempts: Arc<Mutex<Vec<ComposedMail>>>,
    }

    impl MailTransport for RecordingTransport {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn deliver(&self, mail: &ComposedMail) -> DeliveryOutcome {
            self.attempts.lock().unwrap().push(mail.clone());
            DeliveryOutcome::Delivered
        }
    }

    fn recording_context() -> (DispatchContext, Arc<Mutex<Vec<ComposedMail>>>) {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let ctx = DispatchContext::new(Config::default()).with_mail_transports(vec![Box::new(
            RecordingTransport {
                attempts: attempts.clone(),
            },
        )]);
        (ctx, attempts)
    }

    #[test]
    fn test_service_name_canonicalization() {
        assert_eq!(
            service_name_to_address("API-Team!!", "khan-academy.pagerduty.com").unwrap(),
            "api-team@khan-academy.pagerduty.com"
        );
        assert_eq!(
            service_name_to_address("infra.on_call", "khan-academy.pagerduty.com").unwrap(),
            "infra.on_call@khan-academy.pagerduty.com"
        );
    }

    #[test]
    fn test_addresses_are_rejected() {
        let err = service_name_to_address("oncall@pagerduty.com", "d").unwrap_err();
        assert_eq!(
            err,
            AlertError::InvalidServiceName("oncall@pagerduty.com".to_string())
        );
    }

    #[test]
    fn test_dispatch_rides_the_mail_chain() {
        let (ctx, attempts) = recording_context();
        Alert::new("the site is down")
            .send_to_paging(&ctx, &["API-Team!!", "Infra Oncall"])
            .unwrap();

        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(
            attempts[0].to,
            vec![
                "api-team@khan-academy.pagerduty.com".to_string(),
                "infraoncall@khan-academy.pagerduty.com".to_string(),
            ]
        );
        assert!(attempts[0].cc.is_empty());
        assert!(attempts[0].bcc.is_empty());
    }

    #[test]
    fn test_validation_error_propagates_before_delivery() {
        let (ctx, attempts) = recording_context();
        let mut alert = Alert::new("down");
        let result = alert.send_to_paging(&ctx, &["good", "bad@addr"]);
        assert!(result.is_err());
        assert!(attempts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_simulation_attempts_no_delivery() {
        let (ctx, attempts) = recording_context();
        ctx.enter_simulation();
        Alert::new("down").send_to_paging(&ctx, &["oncall"]).unwrap();
        assert!(attempts.lock().unwrap().is_empty());
    }
}
