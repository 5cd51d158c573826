//! E-mail delivery for bug reports and staleness notifications.
//!
//! - [`reports`]: report intake and the lease-based publish cycle.
//! - [`publisher`]: the background loop driving [`reports::publish_cycle`].
//! - [`notifier`]: periodic reminders to operators and centers whose data
//!   has gone stale.

pub mod mailer;
pub mod notifier;
pub mod publisher;
pub mod reports;
pub mod template;

use cwa_map_core::error::CoreError;

pub use mailer::{MailConfig, MailError, Mailer, SmtpMailer};
pub use notifier::{NotifierConfig, OperatorNotifier};
pub use publisher::ReportPublisher;
pub use reports::{PgReportStore, ReportStore};
pub use template::TemplateError;

/// Errors from the notification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}
