//! alertkit - fan-out alert dispatching from within an app.
//!
//! One logical [`Alert`] can be delivered, on demand, to any subset of five
//! backends: a chat room, email, on-call paging, the process/OS logs, and a
//! metrics counter. Each backend applies its own formatting and severity
//! encoding, and each dispatch is independently rate limited.
//!
//! ```no_run
//! use alertkit::{Alert, Config, DispatchContext, Severity};
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = DispatchContext::new(Config::load(None)?);
//! Alert::new("nightly batch job failed")
//!     .with_severity(Severity::Error)
//!     .send_to_chat(&ctx, "1s and 0s", None, None, None)
//!     .send_to_email(&ctx, &["infrastructure"], &[], &[], Some("batch"))?
//!     .send_to_paging(&ctx, &["Infra Oncall"])?
//!     .send_to_logs(&ctx)
//!     .send_to_metrics(&ctx, "batch.failures", 1.0);
//! # Ok(())
//! # }
//! ```
//!
//! Some advice on choosing a backend:
//!
//! * Alerting about something that needs to be *fixed*? Send it to paging,
//!   the only backend that tracks whether a problem was resolved.
//! * Something people should know about right away? Email a role account,
//!   or mention them in a chat message.
//! * Nice-to-know ("the weekly cron finished")? Chat.
//!
//! Delivery is best-effort and fire-and-forget: transport failures are
//! logged and absorbed so one broken backend never stops the rest of a
//! chain. Only validation failures (a recipient that is already a full
//! address, say) surface as errors.

pub mod alert;
pub mod backends;
pub mod config;
pub mod context;
pub mod rate_limit;
pub mod severity;
mod summary;

pub use alert::{Alert, AlertError};
pub use backends::chat::{ChatApi, HttpChatClient, MessageFormat, RoomMessage};
pub use backends::email::{ComposedMail, DeliveryOutcome, HttpMailApi, MailTransport, SmtpRelay};
pub use config::Config;
pub use context::DispatchContext;
pub use severity::{ChatColor, Severity, SeverityMap};
