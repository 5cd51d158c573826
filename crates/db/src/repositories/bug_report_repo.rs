//! Repository for `bug_reports` and the report counters.
//!
//! Queued reports are owned by a publish cycle through the `lease` column:
//! [`BugReportRepo::claim`] stamps every unleased row with the cycle's token,
//! and all later steps select, release or delete by that token only.

use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::bug_report::{BugReport, NewBugReport, ReportStatistic, ReportTarget};

/// Column list for `bug_reports` queries.
const COLUMNS: &str = "\
    uuid, created, receiver, operator_uuid, center_uuid, \
    center_name, center_address, subject, message, lease";

pub struct BugReportRepo;

impl BugReportRepo {
    /// Center and operator fields needed to route a report.
    pub async fn find_target(
        executor: impl PgExecutor<'_>,
        center_uuid: Uuid,
    ) -> Result<Option<ReportTarget>, sqlx::Error> {
        sqlx::query_as::<_, ReportTarget>(
            "SELECT c.uuid AS center_uuid, c.name AS center_name, c.address AS center_address, \
                    c.email AS center_email, o.uuid AS operator_uuid, o.email AS operator_email, \
                    o.report_receiver \
             FROM centers c JOIN operators o ON o.uuid = c.operator_uuid \
             WHERE c.uuid = $1",
        )
        .bind(center_uuid)
        .fetch_optional(executor)
        .await
    }

    /// Queue a new, unleased report.
    pub async fn create(
        executor: impl PgExecutor<'_>,
        input: &NewBugReport,
    ) -> Result<BugReport, sqlx::Error> {
        let query = format!(
            "INSERT INTO bug_reports \
                (uuid, receiver, operator_uuid, center_uuid, center_name, center_address, \
                 subject, message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BugReport>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.receiver)
            .bind(input.operator_uuid)
            .bind(input.center_uuid)
            .bind(&input.center_name)
            .bind(&input.center_address)
            .bind(&input.subject)
            .bind(&input.message)
            .fetch_one(executor)
            .await
    }

    /// Bump the per-(operator, subject) and per-(operator, center, subject)
    /// counters. Run inside a transaction to move both together.
    pub async fn increment_statistics(
        conn: &mut PgConnection,
        operator_uuid: Uuid,
        center_uuid: Uuid,
        subject: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO report_statistics (operator_uuid, subject, count) VALUES ($1, $2, 1) \
             ON CONFLICT (operator_uuid, subject) \
             DO UPDATE SET count = report_statistics.count + 1",
        )
        .bind(operator_uuid)
        .bind(subject)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO report_center_statistics (operator_uuid, center_uuid, subject, count) \
             VALUES ($1, $2, $3, 1) \
             ON CONFLICT (operator_uuid, center_uuid, subject) \
             DO UPDATE SET count = report_center_statistics.count + 1",
        )
        .bind(operator_uuid)
        .bind(center_uuid)
        .bind(subject)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Stamp every unleased report with `lease`. Returns the number claimed.
    pub async fn claim(executor: impl PgExecutor<'_>, lease: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE bug_reports SET lease = $1 WHERE lease IS NULL")
            .bind(lease)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Reports owned by `lease`, in submission order.
    pub async fn find_by_lease(
        executor: impl PgExecutor<'_>,
        lease: Uuid,
    ) -> Result<Vec<BugReport>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bug_reports WHERE lease = $1 ORDER BY seq");
        sqlx::query_as::<_, BugReport>(&query)
            .bind(lease)
            .fetch_all(executor)
            .await
    }

    /// Return the reports owned by `lease` to the queue.
    pub async fn release_lease(executor: impl PgExecutor<'_>, lease: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE bug_reports SET lease = NULL WHERE lease = $1")
            .bind(lease)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_lease(executor: impl PgExecutor<'_>, lease: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bug_reports WHERE lease = $1")
            .bind(lease)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_statistics(pool: &PgPool) -> Result<Vec<ReportStatistic>, sqlx::Error> {
        sqlx::query_as::<_, ReportStatistic>(
            "SELECT s.operator_uuid, o.name AS operator_name, s.subject, s.count \
             FROM report_statistics s LEFT JOIN operators o ON o.uuid = s.operator_uuid \
             ORDER BY o.name, s.subject",
        )
        .fetch_all(pool)
        .await
    }
}
