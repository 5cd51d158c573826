//! Repository for the `operators` table.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::operator::{NewOperator, Operator, UpdateOperator};

/// Column list for `operators` queries.
const COLUMNS: &str = "\
    uuid, subject, name, operator_number, email, report_receiver, \
    notification_token, notified, created_at";

/// Provides CRUD operations for operators.
pub struct OperatorRepo;

impl OperatorRepo {
    /// Return the operator for `input.subject`, creating it on first sight.
    ///
    /// An existing row is returned unchanged; claims are only used to seed a
    /// new operator.
    pub async fn get_or_create(pool: &PgPool, input: &NewOperator) -> Result<Operator, sqlx::Error> {
        let query = format!(
            "INSERT INTO operators (uuid, subject, name, operator_number, email) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (subject) DO UPDATE SET subject = EXCLUDED.subject \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Operator>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.subject)
            .bind(&input.name)
            .bind(&input.operator_number)
            .bind(&input.email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_uuid(
        executor: impl PgExecutor<'_>,
        uuid: Uuid,
    ) -> Result<Option<Operator>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operators WHERE uuid = $1");
        sqlx::query_as::<_, Operator>(&query)
            .bind(uuid)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_subject(pool: &PgPool, subject: &str) -> Result<Option<Operator>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operators WHERE subject = $1");
        sqlx::query_as::<_, Operator>(&query)
            .bind(subject)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Operator>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operators ORDER BY name, uuid");
        sqlx::query_as::<_, Operator>(&query).fetch_all(pool).await
    }

    /// Update the self-service profile. Returns `None` if the operator is gone.
    pub async fn update(
        pool: &PgPool,
        uuid: Uuid,
        input: &UpdateOperator,
    ) -> Result<Option<Operator>, sqlx::Error> {
        let query = format!(
            "UPDATE operators SET name = $2, email = $3, report_receiver = $4 \
             WHERE uuid = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Operator>(&query)
            .bind(uuid)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.report_receiver)
            .fetch_optional(pool)
            .await
    }

    /// Delete an operator; its centers go with it.
    pub async fn delete(pool: &PgPool, uuid: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM operators WHERE uuid = $1")
            .bind(uuid)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Operators with the `operator` report policy whose listed centers have
    /// all been stale for `age_weeks` and who were not notified within
    /// `renotify_weeks`.
    pub async fn find_due_for_notification(
        pool: &PgPool,
        age_weeks: i32,
        renotify_weeks: i32,
    ) -> Result<Vec<Operator>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM operators \
             WHERE report_receiver = 'operator' \
             AND (notified IS NULL OR notified < now() - make_interval(weeks => $2)) \
             AND uuid IN ( \
                SELECT operator_uuid FROM centers \
                WHERE visible IS NOT FALSE \
                AND (enter_date IS NULL OR enter_date <= CURRENT_DATE) \
                AND (leave_date IS NULL OR leave_date >= CURRENT_DATE) \
                GROUP BY operator_uuid \
                HAVING max(last_update) < now() - make_interval(weeks => $1)) \
             ORDER BY uuid"
        );
        sqlx::query_as::<_, Operator>(&query)
            .bind(age_weeks)
            .bind(renotify_weeks)
            .fetch_all(pool)
            .await
    }

    pub async fn set_notification_token(
        pool: &PgPool,
        uuid: Uuid,
        token: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE operators SET notification_token = $2 WHERE uuid = $1")
            .bind(uuid)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_notified(pool: &PgPool, uuid: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE operators SET notified = now() WHERE uuid = $1")
            .bind(uuid)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear a single-use notification token. Returns `false` for unknown tokens.
    pub async fn confirm_notification(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE operators SET notification_token = NULL WHERE notification_token = $1",
        )
        .bind(token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
