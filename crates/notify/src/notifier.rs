//! Staleness reminders.
//!
//! [`OperatorNotifier`] periodically e-mails operators (policy `operator`)
//! whose centers have all gone stale, and centers (policy `center`) that are
//! stale themselves. Each recipient is handled on its own: a failure is
//! logged and the run moves on to the next one.

use std::sync::Arc;
use std::time::Duration;

use cwa_map_core::error::CoreError;
use cwa_map_core::settings;
use cwa_map_db::models::center::Center;
use cwa_map_db::models::operator::Operator;
use cwa_map_db::repositories::{CenterRepo, OperatorRepo, SystemSettingRepo};
use cwa_map_db::DbPool;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::mailer::Mailer;
use crate::{template, NotifyError};

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub interval: Duration,
    /// Centers older than this are stale.
    pub age_weeks: i32,
    /// Minimum distance between two reminders to the same recipient.
    pub renotify_weeks: i32,
}

/// Counts of one notifier run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub notified: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct OperatorMail<'a> {
    #[serde(flatten)]
    operator: &'a Operator,
    notification_token: &'a str,
}

#[derive(Serialize)]
struct CenterMail<'a> {
    #[serde(flatten)]
    center: &'a Center,
}

pub struct OperatorNotifier {
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
    config: NotifierConfig,
}

impl OperatorNotifier {
    pub fn new(pool: DbPool, mailer: Arc<dyn Mailer>, config: NotifierConfig) -> Self {
        Self {
            pool,
            mailer,
            config,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            age_weeks = self.config.age_weeks,
            renotify_weeks = self.config.renotify_weeks,
            "Operator notifier started"
        );
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Operator notifier cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "Error processing notifications");
                    }
                }
            }
        }
    }

    /// Notify every operator and center that is due.
    pub async fn run_cycle(&self) -> Result<NotifyOutcome, sqlx::Error> {
        let mut outcome = NotifyOutcome::default();

        let operators = OperatorRepo::find_due_for_notification(
            &self.pool,
            self.config.age_weeks,
            self.config.renotify_weeks,
        )
        .await?;
        for operator in &operators {
            match self.notify_operator(operator).await {
                Ok(()) => outcome.notified += 1,
                Err(e) => {
                    tracing::error!(operator = %operator.uuid, error = %e, "Error notifying operator");
                    outcome.failed += 1;
                }
            }
        }

        let centers = CenterRepo::find_centers_due_for_notification(
            &self.pool,
            self.config.age_weeks,
            self.config.renotify_weeks,
        )
        .await?;
        for center in &centers {
            match self.notify_center(center).await {
                Ok(()) => outcome.notified += 1,
                Err(e) => {
                    tracing::error!(center = %center.uuid, error = %e, "Error notifying center");
                    outcome.failed += 1;
                }
            }
        }

        if outcome != NotifyOutcome::default() {
            tracing::info!(
                notified = outcome.notified,
                failed = outcome.failed,
                "Processed staleness notifications"
            );
        }
        Ok(outcome)
    }

    /// Remind one operator, creating its confirmation token on first use.
    pub async fn notify_operator(&self, operator: &Operator) -> Result<(), NotifyError> {
        let email = non_empty(operator.email.as_deref())
            .ok_or_else(|| CoreError::Validation("missing email".into()))?;
        tracing::info!(operator = %operator.uuid, "Processing operator notification");

        let token = match operator.notification_token.as_deref() {
            Some(token) => token.to_string(),
            None => {
                let token = Uuid::new_v4().to_string();
                OperatorRepo::set_notification_token(&self.pool, operator.uuid, &token).await?;
                token
            }
        };

        let context = OperatorMail {
            operator,
            notification_token: &token,
        };
        self.send_template(
            email,
            settings::OPERATOR_NOTIFICATION_TEMPLATE,
            settings::OPERATOR_NOTIFICATION_SUBJECT,
            context,
        )
        .await?;

        OperatorRepo::mark_notified(&self.pool, operator.uuid).await?;
        Ok(())
    }

    pub async fn notify_center(&self, center: &Center) -> Result<(), NotifyError> {
        let email = non_empty(center.email.as_deref())
            .ok_or_else(|| CoreError::Validation("missing email".into()))?;
        tracing::info!(center = %center.uuid, "Processing center notification");

        self.send_template(
            email,
            settings::CENTER_NOTIFICATION_TEMPLATE,
            settings::CENTER_NOTIFICATION_SUBJECT,
            CenterMail { center },
        )
        .await?;

        CenterRepo::mark_notified(&self.pool, center.uuid).await?;
        Ok(())
    }

    async fn send_template<S: Serialize + Send>(
        &self,
        receiver: &str,
        template_key: &str,
        subject_key: &str,
        context: S,
    ) -> Result<(), NotifyError> {
        let body_template = SystemSettingRepo::find_value(&self.pool, template_key)
            .await?
            .ok_or_else(|| CoreError::Configuration(format!("missing template {template_key}")))?;
        let subject = SystemSettingRepo::find_value(&self.pool, subject_key)
            .await?
            .ok_or_else(|| CoreError::Configuration(format!("missing subject {subject_key}")))?;

        let body = template::render(&body_template, context)?;
        self.mailer.send(receiver, &subject, "text/html", &body).await?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
