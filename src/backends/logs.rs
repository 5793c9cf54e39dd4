//! The log backend: the process's structured log, plus the OS syslog.
//!
//! The primary write goes to the process's `tracing` facility at the
//! alert's severity and always happens, even in simulation mode; local
//! logging is safe and idempotent. The secondary OS syslog write is
//! best-effort and is skipped in simulation mode or whenever the facility
//! is unavailable.

use crate::alert::Alert;
use crate::context::DispatchContext;
use crate::severity::Severity;
use tracing::{debug, error, info, warn};

impl Alert {
    /// Records the alert in the process log, and (outside simulation mode)
    /// in the OS syslog.
    pub fn send_to_logs(&mut self, ctx: &DispatchContext) -> &mut Self {
        if !self.rate_limiter.allowed("logs") {
            return self;
        }

        // tracing has no level above ERROR; Critical is flagged instead.
        match self.severity() {
            Severity::Debug => debug!("{}", self.message()),
            Severity::Info => info!("{}", self.message()),
            Severity::Warning => warn!("{}", self.message()),
            Severity::Error => error!("{}", self.message()),
            Severity::Critical => error!(critical = true, "{}", self.message()),
        }

        if !ctx.simulated() {
            ctx.syslog().write(self.severity(), self.message());
        }

        self
    }
}

#[cfg(unix)]
mod sys {
    use crate::severity::Severity;
    use std::sync::Mutex;
    use syslog::{Facility, Formatter3164, Logger, LoggerBackend};

    enum Slot {
        Unopened,
        Open(Box<Logger<LoggerBackend, Formatter3164>>),
        Unavailable,
    }

    /// Lazily opened handle to the OS syslog. Every failure mode (no
    /// syslog socket on this host, write error) degrades to a silent skip;
    /// only the primary structured log is guaranteed.
    pub(crate) struct SyslogWriter {
        slot: Mutex<Slot>,
    }

    impl SyslogWriter {
        pub(crate) fn new() -> Self {
            Self {
                slot: Mutex::new(Slot::Unopened),
            }
        }

        pub(crate) fn write(&self, severity: Severity, message: &str) {
            let Ok(mut slot) = self.slot.lock() else {
                return;
            };

            if matches!(*slot, Slot::Unopened) {
                let formatter = Formatter3164 {
                    facility: Facility::LOG_USER,
                    hostname: None,
                    process: "alertkit".to_string(),
                    pid: 0,
                };
                *slot = match syslog::unix(formatter) {
                    Ok(logger) => Slot::Open(Box::new(logger)),
                    Err(_) => Slot::Unavailable,
                };
            }

            if let Slot::Open(logger) = &mut *slot {
                let _ = match severity {
                    Severity::Debug => logger.debug(message),
                    Severity::Info => logger.info(message),
                    Severity::Warning => logger.warning(message),
                    Severity::Error => logger.err(message),
                    Severity::Critical => logger.crit(message),
                };
            }
        }
    }
}

#[cfg(unix)]
pub(crate) use sys::SyslogWriter;

#[cfg(not(unix))]
pub(crate) struct SyslogWriter;

#[cfg(not(unix))]
impl SyslogWriter {
    pub(crate) fn new() -> Self {
        SyslogWriter
    }

    pub(crate) fn write(&self, _severity: crate::severity::Severity, _message: &str) {}
}
