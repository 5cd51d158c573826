//! Keys of the runtime-editable `system_settings` table.

/// Fallback recipient when neither center nor operator has an e-mail.
pub const REPORTS_EMAIL_DEFAULT: &str = "reports.email.default";
pub const REPORTS_EMAIL_TEMPLATE: &str = "reports.email.template";
pub const REPORTS_EMAIL_SUBJECT: &str = "reports.email.subject";

pub const OPERATOR_NOTIFICATION_TEMPLATE: &str = "operator.notification.template";
pub const OPERATOR_NOTIFICATION_SUBJECT: &str = "operator.notification.subject";

pub const CENTER_NOTIFICATION_TEMPLATE: &str = "center.notification.template";
pub const CENTER_NOTIFICATION_SUBJECT: &str = "center.notification.subject";
