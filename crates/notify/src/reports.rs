//! Bug report intake and the lease-based publish cycle.
//!
//! A publish cycle owns the reports it claimed through a fresh lease token.
//! Reports are deleted only after every recipient's mail went out; any
//! failure before that hands the whole working set back to the queue.

use async_trait::async_trait;
use cwa_map_core::bug_report::{
    group_reports, resolve_recipient, validate_message, validate_subject,
};
use cwa_map_core::error::CoreError;
use cwa_map_core::settings;
use cwa_map_db::models::bug_report::{BugReport, NewBugReport, ReportTarget};
use cwa_map_db::repositories::{BugReportRepo, SystemSettingRepo};
use cwa_map_db::DbPool;
use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::mailer::Mailer;
use crate::{template, NotifyError};

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// Persistence needed by intake and the publish cycle.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_target(&self, center_uuid: Uuid) -> Result<Option<ReportTarget>, sqlx::Error>;

    async fn find_setting(&self, key: &str) -> Result<Option<String>, sqlx::Error>;

    /// Insert the report and bump both counters atomically.
    async fn record_report(&self, report: NewBugReport) -> Result<BugReport, sqlx::Error>;

    /// Stamp all unleased reports with `lease`.
    async fn claim(&self, lease: Uuid) -> Result<u64, sqlx::Error>;

    async fn find_by_lease(&self, lease: Uuid) -> Result<Vec<BugReport>, sqlx::Error>;

    async fn release_lease(&self, lease: Uuid) -> Result<u64, sqlx::Error>;

    async fn delete_by_lease(&self, lease: Uuid) -> Result<u64, sqlx::Error>;
}

/// [`ReportStore`] over the Postgres repositories.
#[derive(Clone)]
pub struct PgReportStore {
    pool: DbPool,
}

impl PgReportStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn find_target(&self, center_uuid: Uuid) -> Result<Option<ReportTarget>, sqlx::Error> {
        BugReportRepo::find_target(&self.pool, center_uuid).await
    }

    async fn find_setting(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        SystemSettingRepo::find_value(&self.pool, key).await
    }

    async fn record_report(&self, report: NewBugReport) -> Result<BugReport, sqlx::Error> {
        cwa_map_db::use_transaction(&self.pool, move |conn| {
            Box::pin(async move {
                let created = BugReportRepo::create(&mut *conn, &report).await?;
                BugReportRepo::increment_statistics(
                    conn,
                    created.operator_uuid,
                    created.center_uuid,
                    &created.subject,
                )
                .await?;
                Ok(created)
            })
        })
        .await
    }

    async fn claim(&self, lease: Uuid) -> Result<u64, sqlx::Error> {
        BugReportRepo::claim(&self.pool, lease).await
    }

    async fn find_by_lease(&self, lease: Uuid) -> Result<Vec<BugReport>, sqlx::Error> {
        BugReportRepo::find_by_lease(&self.pool, lease).await
    }

    async fn release_lease(&self, lease: Uuid) -> Result<u64, sqlx::Error> {
        BugReportRepo::release_lease(&self.pool, lease).await
    }

    async fn delete_by_lease(&self, lease: Uuid) -> Result<u64, sqlx::Error> {
        BugReportRepo::delete_by_lease(&self.pool, lease).await
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// Queue a report about `center_uuid` for the next publish cycle.
pub async fn submit_report(
    store: &dyn ReportStore,
    center_uuid: Uuid,
    subject: &str,
    message: Option<&str>,
) -> Result<BugReport, NotifyError> {
    validate_subject(subject)?;
    let message = message.map(str::trim).filter(|m| !m.is_empty());
    if let Some(message) = message {
        validate_message(message)?;
    }

    let target = store
        .find_target(center_uuid)
        .await?
        .ok_or_else(|| CoreError::not_found("Center", center_uuid))?;

    let default_email = store.find_setting(settings::REPORTS_EMAIL_DEFAULT).await?;
    let receiver = resolve_recipient(
        &target.report_receiver,
        target.center_email.as_deref(),
        target.operator_email.as_deref(),
        default_email.as_deref(),
    )?;

    let report = store
        .record_report(NewBugReport {
            receiver,
            operator_uuid: target.operator_uuid,
            center_uuid: target.center_uuid,
            center_name: target.center_name,
            center_address: target.center_address,
            subject: subject.to_string(),
            message: message.map(str::to_string),
        })
        .await?;

    tracing::info!(report = %report.uuid, center = %center_uuid, subject = %report.subject, "Bug report queued");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Publish cycle
// ---------------------------------------------------------------------------

/// What one cycle delivered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    pub reports: usize,
    pub recipients: usize,
}

/// Template context of a report mail.
#[derive(Serialize)]
struct ReportMail<'a> {
    #[serde(rename = "Centers")]
    centers: &'a IndexMap<Uuid, Vec<BugReport>>,
}

/// Drain the queue once: claim, render, send, then delete.
pub async fn publish_cycle(
    store: &dyn ReportStore,
    mailer: &dyn Mailer,
) -> Result<PublishOutcome, NotifyError> {
    let lease = Uuid::new_v4();
    let claimed = store.claim(lease).await?;
    if claimed == 0 {
        tracing::debug!("No bug reports to publish");
        return Ok(PublishOutcome::default());
    }
    tracing::info!(%lease, claimed, "Publishing bug reports");

    match deliver_leased(store, mailer, lease).await {
        Ok(outcome) => {
            store.delete_by_lease(lease).await?;
            tracing::info!(
                %lease,
                reports = outcome.reports,
                recipients = outcome.recipients,
                "Bug reports published"
            );
            Ok(outcome)
        }
        Err(e) => {
            match store.release_lease(lease).await {
                Ok(released) => tracing::warn!(%lease, released, error = %e, "Publishing failed, lease released"),
                Err(release) => {
                    tracing::error!(%lease, error = %release, "Failed to release bug report lease")
                }
            }
            Err(e)
        }
    }
}

async fn deliver_leased(
    store: &dyn ReportStore,
    mailer: &dyn Mailer,
    lease: Uuid,
) -> Result<PublishOutcome, NotifyError> {
    let reports = store.find_by_lease(lease).await?;

    let body_template = store
        .find_setting(settings::REPORTS_EMAIL_TEMPLATE)
        .await?
        .ok_or_else(|| CoreError::Configuration("missing template".into()))?;
    let subject = store
        .find_setting(settings::REPORTS_EMAIL_SUBJECT)
        .await?
        .ok_or_else(|| CoreError::Configuration("missing subject".into()))?;

    let count = reports.len();
    let grouped = group_reports(reports, |r| r.receiver.clone(), |r| r.center_uuid);

    for (receiver, centers) in &grouped {
        let body = template::render(&body_template, ReportMail { centers })?;
        mailer.send(receiver, &subject, "text/html", &body).await?;
    }

    Ok(PublishOutcome {
        reports: count,
        recipients: grouped.len(),
    })
}
