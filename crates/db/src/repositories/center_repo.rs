//! Repository for the `centers` table.

use cwa_map_core::center::{resolve_center_uuid, Bounds};
use cwa_map_core::error::CoreError;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::center::{
    Center, CenterExportRow, CenterFilter, CenterPage, CenterStatistics, SaveCenter,
};

/// Column list for `centers` queries.
const COLUMNS: &str = "\
    uuid, operator_uuid, user_reference, name, operator_name, lab_id, \
    email, website, address, address_note, zip, region, \
    longitude, latitude, coordinates_fixed, opening_hours, appointment, \
    test_kinds, dcc, enter_date, leave_date, visible, message, \
    ranking, last_update, notified";

/// Centers inside their `[enter_date, leave_date]` window and not hidden.
const CURRENTLY_LISTED: &str = "\
    visible IS NOT FALSE \
    AND (enter_date IS NULL OR enter_date <= CURRENT_DATE) \
    AND (leave_date IS NULL OR leave_date >= CURRENT_DATE)";

const REFERENCE_CONSTRAINT: &str = "uq_centers_operator_reference";

/// Failure of [`CenterRepo::save`].
#[derive(Debug, thiserror::Error)]
pub enum SaveCenterError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A bind value for dynamically assembled viewport queries.
enum BindValue {
    Float(f64),
    Int(i32),
    Text(&'static str),
}

/// Provides persistence for centers.
pub struct CenterRepo;

impl CenterRepo {
    /// Create or update a center.
    ///
    /// A set `user_reference` already used by another center of the same
    /// operator makes the save target that center (upsert by reference),
    /// unless the input names a different UUID, which is a
    /// [`CoreError::DuplicateUserReference`]. New centers get their ranking
    /// here; updates never touch it. `last_update` strictly increases on
    /// every save.
    pub async fn save(conn: &mut PgConnection, input: &SaveCenter) -> Result<Center, SaveCenterError> {
        let holder = match input.user_reference.as_deref() {
            Some(reference) => {
                Self::find_by_operator_and_user_reference(&mut *conn, input.operator_uuid, reference)
                    .await?
                    .map(|c| c.uuid)
            }
            None => None,
        };
        let resolved = resolve_center_uuid(input.uuid, holder, input.user_reference.as_deref())?;
        // A brand-new reference may be inserted concurrently by another
        // save; let the reference constraint pick the surviving row.
        let conflict_target = match (resolved, &input.user_reference) {
            (None, Some(_)) => "(operator_uuid, user_reference)",
            _ => "(uuid)",
        };
        let uuid = resolved.unwrap_or_else(Uuid::new_v4);

        let query = format!(
            "INSERT INTO centers \
                (uuid, operator_uuid, user_reference, name, operator_name, lab_id, \
                 email, website, address, address_note, zip, region, \
                 longitude, latitude, coordinates_fixed, opening_hours, appointment, \
                 test_kinds, dcc, enter_date, leave_date, visible, message, \
                 ranking, last_update) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
                     $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, \
                     $24, now()) \
             ON CONFLICT {conflict_target} DO UPDATE SET \
                user_reference = EXCLUDED.user_reference, \
                name = EXCLUDED.name, \
                operator_name = EXCLUDED.operator_name, \
                lab_id = EXCLUDED.lab_id, \
                email = EXCLUDED.email, \
                website = EXCLUDED.website, \
                address = EXCLUDED.address, \
                address_note = EXCLUDED.address_note, \
                zip = EXCLUDED.zip, \
                region = EXCLUDED.region, \
                longitude = EXCLUDED.longitude, \
                latitude = EXCLUDED.latitude, \
                coordinates_fixed = EXCLUDED.coordinates_fixed, \
                opening_hours = EXCLUDED.opening_hours, \
                appointment = EXCLUDED.appointment, \
                test_kinds = EXCLUDED.test_kinds, \
                dcc = EXCLUDED.dcc, \
                enter_date = EXCLUDED.enter_date, \
                leave_date = EXCLUDED.leave_date, \
                visible = EXCLUDED.visible, \
                message = EXCLUDED.message, \
                last_update = GREATEST(now(), centers.last_update + INTERVAL '1 microsecond') \
             RETURNING {COLUMNS}"
        );

        let center = sqlx::query_as::<_, Center>(&query)
            .bind(uuid)
            .bind(input.operator_uuid)
            .bind(&input.user_reference)
            .bind(&input.name)
            .bind(&input.operator_name)
            .bind(&input.lab_id)
            .bind(&input.email)
            .bind(&input.website)
            .bind(&input.address)
            .bind(&input.address_note)
            .bind(&input.zip)
            .bind(&input.region)
            .bind(input.longitude)
            .bind(input.latitude)
            .bind(input.coordinates_fixed)
            .bind(&input.opening_hours)
            .bind(&input.appointment)
            .bind(&input.test_kinds)
            .bind(input.dcc)
            .bind(input.enter_date)
            .bind(input.leave_date)
            .bind(input.visible)
            .bind(&input.message)
            .bind(cwa_map_core::center::new_ranking())
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                let taken = matches!(
                    &e,
                    sqlx::Error::Database(db) if db.constraint() == Some(REFERENCE_CONSTRAINT)
                );
                if taken {
                    SaveCenterError::Core(CoreError::DuplicateUserReference(
                        input.user_reference.clone().unwrap_or_default(),
                    ))
                } else {
                    SaveCenterError::Database(e)
                }
            })?;

        Ok(center)
    }

    /// Store a geocoding outcome (zip, region, coordinates, message) on an
    /// existing center. Fixed coordinates are kept. Returns `None` if the
    /// center no longer exists; deleted centers are never re-created here.
    pub async fn update_geocoding(
        executor: impl PgExecutor<'_>,
        input: &SaveCenter,
    ) -> Result<Option<Center>, sqlx::Error> {
        let uuid = match input.uuid {
            Some(uuid) => uuid,
            None => return Ok(None),
        };
        let query = format!(
            "UPDATE centers SET \
                zip = $2, \
                region = $3, \
                longitude = CASE WHEN coordinates_fixed THEN longitude ELSE $4 END, \
                latitude = CASE WHEN coordinates_fixed THEN latitude ELSE $5 END, \
                message = $6, \
                last_update = GREATEST(now(), last_update + INTERVAL '1 microsecond') \
             WHERE uuid = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Center>(&query)
            .bind(uuid)
            .bind(&input.zip)
            .bind(&input.region)
            .bind(input.longitude)
            .bind(input.latitude)
            .bind(&input.message)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_uuid(
        executor: impl PgExecutor<'_>,
        uuid: Uuid,
    ) -> Result<Option<Center>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM centers WHERE uuid = $1");
        sqlx::query_as::<_, Center>(&query)
            .bind(uuid)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_operator_and_user_reference(
        executor: impl PgExecutor<'_>,
        operator_uuid: Uuid,
        user_reference: &str,
    ) -> Result<Option<Center>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM centers WHERE operator_uuid = $1 AND user_reference = $2"
        );
        sqlx::query_as::<_, Center>(&query)
            .bind(operator_uuid)
            .bind(user_reference)
            .fetch_optional(executor)
            .await
    }

    /// One page of an operator's centers, optionally filtered by a
    /// case-insensitive substring of name or address. `pattern` is an
    /// already-escaped `LIKE` pattern (see `cwa_map_core::search::like_pattern`).
    pub async fn find_by_operator(
        pool: &PgPool,
        operator_uuid: Uuid,
        pattern: Option<&str>,
        page: i64,
        size: i64,
    ) -> Result<CenterPage, sqlx::Error> {
        let where_clause = if pattern.is_some() {
            "WHERE operator_uuid = $1 AND (name ILIKE $2 OR address ILIKE $2)"
        } else {
            "WHERE operator_uuid = $1"
        };

        let count_query = format!("SELECT COUNT(*) FROM centers {where_clause}");
        let mut count = sqlx::query_scalar::<_, i64>(&count_query).bind(operator_uuid);
        if let Some(p) = pattern {
            count = count.bind(p);
        }
        let count = count.fetch_one(pool).await?;

        let (limit_idx, offset_idx) = if pattern.is_some() { (3, 4) } else { (2, 3) };
        let query = format!(
            "SELECT {COLUMNS} FROM centers {where_clause} \
             ORDER BY user_reference NULLS LAST, uuid \
             LIMIT ${limit_idx} OFFSET ${offset_idx}"
        );
        let mut q = sqlx::query_as::<_, Center>(&query).bind(operator_uuid);
        if let Some(p) = pattern {
            q = q.bind(p);
        }
        let centers = q.bind(size).bind(page * size).fetch_all(pool).await?;

        Ok(CenterPage { count, centers })
    }

    /// Count the rows of the public viewport predicate.
    pub async fn count_by_bounds(
        pool: &PgPool,
        bounds: &Bounds,
        filter: &CenterFilter,
        freshness_weeks: i32,
    ) -> Result<i64, sqlx::Error> {
        let (predicate, binds) = viewport_predicate(bounds, filter, freshness_weeks);
        let query = format!("SELECT COUNT(*) FROM centers WHERE {predicate}");

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for bind in binds {
            q = match bind {
                BindValue::Float(v) => q.bind(v),
                BindValue::Int(v) => q.bind(v),
                BindValue::Text(v) => q.bind(v),
            };
        }
        q.fetch_one(pool).await
    }

    /// Rows of the public viewport predicate with `ranking <= fraction`,
    /// ordered by UUID.
    pub async fn find_by_bounds(
        pool: &PgPool,
        bounds: &Bounds,
        filter: &CenterFilter,
        freshness_weeks: i32,
        fraction: f64,
    ) -> Result<Vec<Center>, sqlx::Error> {
        let (predicate, binds) = viewport_predicate(bounds, filter, freshness_weeks);
        let ranking_idx = binds.len() + 1;
        let query = format!(
            "SELECT {COLUMNS} FROM centers \
             WHERE {predicate} AND ranking <= ${ranking_idx} \
             ORDER BY uuid"
        );

        let mut q = sqlx::query_as::<_, Center>(&query);
        for bind in binds {
            q = match bind {
                BindValue::Float(v) => q.bind(v),
                BindValue::Int(v) => q.bind(v),
                BindValue::Text(v) => q.bind(v),
            };
        }
        q.bind(fraction).fetch_all(pool).await
    }

    /// Centers of operators with the `center` report policy that are listed,
    /// stale for `age_weeks`, and not notified within `renotify_weeks`.
    pub async fn find_centers_due_for_notification(
        pool: &PgPool,
        age_weeks: i32,
        renotify_weeks: i32,
    ) -> Result<Vec<Center>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM centers \
             WHERE operator_uuid IN \
                (SELECT uuid FROM operators WHERE report_receiver = 'center') \
             AND {CURRENTLY_LISTED} \
             AND last_update < now() - make_interval(weeks => $1) \
             AND (notified IS NULL OR notified < now() - make_interval(weeks => $2)) \
             ORDER BY uuid"
        );
        sqlx::query_as::<_, Center>(&query)
            .bind(age_weeks)
            .bind(renotify_weeks)
            .fetch_all(pool)
            .await
    }

    /// Record a notification without touching `last_update`.
    pub async fn mark_notified(pool: &PgPool, uuid: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE centers SET notified = now() WHERE uuid = $1")
            .bind(uuid)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_all_uuids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>("SELECT uuid FROM centers ORDER BY uuid")
            .fetch_all(pool)
            .await
    }

    /// All centers joined with their operator, for the admin export.
    pub async fn find_all_for_export(pool: &PgPool) -> Result<Vec<CenterExportRow>, sqlx::Error> {
        sqlx::query_as::<_, CenterExportRow>(
            "SELECT o.subject AS partner_subject, o.uuid AS partner_uuid, \
                    o.name AS partner_name, o.operator_number AS partner_number, c.* \
             FROM centers c JOIN operators o ON o.uuid = c.operator_uuid \
             ORDER BY o.name, c.user_reference NULLS LAST, c.uuid",
        )
        .fetch_all(pool)
        .await
    }

    /// Returns `true` if a row was deleted.
    pub async fn delete(executor: impl PgExecutor<'_>, uuid: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM centers WHERE uuid = $1")
            .bind(uuid)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_operator(
        executor: impl PgExecutor<'_>,
        operator_uuid: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM centers WHERE operator_uuid = $1")
            .bind(operator_uuid)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_operator_and_user_reference(
        executor: impl PgExecutor<'_>,
        operator_uuid: Uuid,
        user_reference: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM centers WHERE operator_uuid = $1 AND user_reference = $2")
                .bind(operator_uuid)
                .bind(user_reference)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_statistics(pool: &PgPool) -> Result<CenterStatistics, sqlx::Error> {
        sqlx::query_as::<_, CenterStatistics>(
            "SELECT \
                (SELECT COUNT(*) FROM centers) AS centers, \
                (SELECT COUNT(*) FROM centers WHERE dcc IS TRUE) AS dcc, \
                (SELECT COUNT(*) FROM centers WHERE visible IS NOT TRUE) AS invisible, \
                (SELECT COUNT(*) FROM operators) AS operators",
        )
        .fetch_one(pool)
        .await
    }
}

/// Build the public viewport predicate and its bind values, numbered from `$1`.
fn viewport_predicate(
    bounds: &Bounds,
    filter: &CenterFilter,
    freshness_weeks: i32,
) -> (String, Vec<BindValue>) {
    let mut conditions: Vec<String> = vec![
        "latitude BETWEEN $1 AND $2".to_string(),
        "longitude BETWEEN $3 AND $4".to_string(),
        CURRENTLY_LISTED.to_string(),
    ];
    let mut binds = vec![
        BindValue::Float(bounds.sw.latitude),
        BindValue::Float(bounds.ne.latitude),
        BindValue::Float(bounds.sw.longitude),
        BindValue::Float(bounds.ne.longitude),
    ];

    if !filter.include_outdated {
        binds.push(BindValue::Int(freshness_weeks));
        conditions.push(format!(
            "last_update > now() - make_interval(weeks => ${})",
            binds.len()
        ));
    }
    if filter.dcc == Some(true) {
        conditions.push("dcc IS TRUE".to_string());
    }
    if let Some(appointment) = filter.appointment {
        binds.push(BindValue::Text(appointment.as_str()));
        conditions.push(format!("appointment = ${}", binds.len()));
    }
    if let Some(kind) = filter.test_kind {
        binds.push(BindValue::Text(kind.as_str()));
        conditions.push(format!("test_kinds @> ARRAY[${}]::text[]", binds.len()));
    }

    (conditions.join(" AND "), binds)
}
