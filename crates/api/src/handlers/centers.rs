//! Handlers for `/api/centers`.
//!
//! The viewport search, address lookup and report intake are public. Every
//! other endpoint acts on behalf of the operator behind the caller's token;
//! `admin` may read, edit and delete centers of any operator.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use cwa_map_core::center::{AppointmentType, Bounds, Coordinates, TestKind};
use cwa_map_core::csv_import::parse_centers;
use cwa_map_core::error::CoreError;
use cwa_map_core::roles::ROLE_DCC;
use cwa_map_core::sampler::sampling_fraction;
use cwa_map_core::search::{clamp_page, clamp_page_size, like_pattern, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use cwa_map_db::models::center::{Center, CenterFilter, SaveCenter};
use cwa_map_db::repositories::CenterRepo;
use cwa_map_db::use_transaction;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dto::center::{
    CenterDto, CenterSummary, CreateBugReportRequest, EditCenterDto, FindCentersResponse,
    GeocodeResponse, ImportCentersRequest, ImportPreviewRow, PageCenterDto,
};
use crate::error::{field_errors, AppError, AppResult};
use crate::export::write_centers_csv;
use crate::handlers::current_operator;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FindCentersQuery {
    pub latne: Option<f64>,
    pub lngne: Option<f64>,
    pub latsw: Option<f64>,
    pub lngsw: Option<f64>,
    pub appointment: Option<String>,
    pub dcc: Option<String>,
    pub kind: Option<String>,
}

impl FindCentersQuery {
    fn bounds(&self) -> Option<Bounds> {
        Some(Bounds {
            ne: Coordinates {
                latitude: self.latne?,
                longitude: self.lngne?,
            },
            sw: Coordinates {
                latitude: self.latsw?,
                longitude: self.lngsw?,
            },
        })
    }

    /// Unknown filter values are ignored.
    fn filter(&self) -> CenterFilter {
        CenterFilter {
            dcc: self.dcc.as_deref().and_then(|v| v.trim().parse().ok()),
            appointment: self.appointment.as_deref().and_then(AppointmentType::parse),
            test_kind: self.kind.as_deref().and_then(TestKind::parse),
            include_outdated: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListCentersQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

// ---------------------------------------------------------------------------
// Public
// ---------------------------------------------------------------------------

/// GET /api/centers/?latne&lngne&latsw&lngsw
///
/// Sample of the listed centers inside the viewport, at most the configured
/// result limit on average.
pub async fn find_centers(
    State(state): State<AppState>,
    Query(params): Query<FindCentersQuery>,
) -> AppResult<impl IntoResponse> {
    let bounds = params
        .bounds()
        .ok_or_else(|| AppError::BadRequest("latne, lngne, latsw and lngsw are required".into()))?;
    let filter = params.filter();
    let search = state.config.search;
    state.metrics.record_find_request();

    let count = CenterRepo::count_by_bounds(&state.pool, &bounds, &filter, search.freshness_weeks).await?;
    let centers = match sampling_fraction(search.result_limit, count) {
        Some(fraction) => {
            CenterRepo::find_by_bounds(&state.pool, &bounds, &filter, search.freshness_weeks, fraction)
                .await?
        }
        None => Vec::new(),
    };

    tracing::debug!(matching = count, delivered = centers.len(), "Viewport search");
    state.metrics.record_delivered(centers.len());

    Ok(Json(FindCentersResponse {
        centers: centers.iter().map(CenterSummary::from).collect(),
    }))
}

/// GET /api/centers/bounds?address=...
pub async fn geocode_address(
    State(state): State<AppState>,
    Query(params): Query<AddressQuery>,
) -> AppResult<impl IntoResponse> {
    state.metrics.record_geocode_request();

    let address = params
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| AppError::BadRequest("address is required".into()))?;

    let result = state.geocoder.lookup(address).await?;
    Ok(Json(GeocodeResponse::from(result)))
}

/// POST /api/centers/{uuid}/report
pub async fn submit_report(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(input): Json<CreateBugReportRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    cwa_map_notify::reports::submit_report(
        state.reports.as_ref(),
        uuid,
        input.subject.trim(),
        input.message.as_deref(),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// GET /api/centers/all?search&page&size
pub async fn list_own(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ListCentersQuery>,
) -> AppResult<impl IntoResponse> {
    let operator = current_operator(&state, &user).await?;
    let page = clamp_page(params.page);
    let size = clamp_page_size(params.size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let pattern = like_pattern(params.search.as_deref());

    let result = CenterRepo::find_by_operator(&state.pool, operator.uuid, pattern.as_deref(), page, size).await?;
    Ok(Json(PageCenterDto {
        count: result.count,
        result: result.centers.iter().map(CenterDto::from).collect(),
    }))
}

/// POST /api/centers/csv
///
/// Parse an uploaded spreadsheet into preview rows. Nothing is stored.
pub async fn preview_csv(_user: AuthUser, body: Bytes) -> AppResult<impl IntoResponse> {
    let rows = parse_centers(body.as_ref())?;
    tracing::info!(rows = rows.len(), "Parsed CSV import preview");
    Ok(Json(
        rows.into_iter().map(ImportPreviewRow::from).collect::<Vec<_>>(),
    ))
}

/// POST /api/centers/
///
/// Save all centers in one transaction, matching existing centers by user
/// reference, then geocode them in the background.
pub async fn import_centers(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ImportCentersRequest>,
) -> AppResult<impl IntoResponse> {
    let mut errors = Vec::new();
    for (i, center) in input.centers.iter().enumerate() {
        if let Err(e) = center.validate() {
            errors.extend(field_errors(&e, Some(&format!("centers[{i}]"))));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let operator = current_operator(&state, &user).await?;
    let operator_uuid = operator.uuid;
    let may_set_dcc = user.has_role(ROLE_DCC);
    let delete_all = input.delete_all;
    let inputs: Vec<SaveCenter> = input
        .centers
        .iter()
        .map(|c| c.to_new_center(operator_uuid, may_set_dcc))
        .collect();

    let saved = use_transaction(&state.pool, move |conn| {
        Box::pin(async move {
            if delete_all {
                let removed = CenterRepo::delete_by_operator(&mut *conn, operator_uuid).await?;
                tracing::info!(operator = %operator_uuid, removed, "Deleted centers before import");
            }
            let mut saved = Vec::with_capacity(inputs.len());
            for input in &inputs {
                saved.push(CenterRepo::save(&mut *conn, input).await?);
            }
            Ok::<_, AppError>(saved)
        })
    })
    .await?;

    tracing::info!(operator = %operator_uuid, count = saved.len(), "Centers imported");

    let worker = state.geocoding_worker();
    let uuids = saved.iter().map(|c| c.uuid).collect();
    tokio::spawn(async move {
        worker.run_batch(uuids).await;
    });

    Ok(Json(saved.iter().map(CenterDto::from).collect::<Vec<_>>()))
}

/// Load a center the caller may access, answering 404 otherwise.
async fn load_accessible(state: &AppState, user: &AuthUser, uuid: Uuid) -> AppResult<Center> {
    let operator = current_operator(state, user).await?;
    CenterRepo::find_by_uuid(&state.pool, uuid)
        .await?
        .filter(|c| c.operator_uuid == operator.uuid || user.is_admin())
        .ok_or_else(|| AppError::Core(CoreError::not_found("Center", uuid)))
}

/// GET /api/centers/{uuid}
pub async fn get_center(
    user: AuthUser,
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let center = load_accessible(&state, &user, uuid).await?;
    Ok(Json(CenterDto::from(&center)))
}

/// PUT /api/centers/{uuid}
///
/// Save the edit, then geocode the new address right away.
pub async fn update_center(
    user: AuthUser,
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(input): Json<EditCenterDto>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let center = load_accessible(&state, &user, uuid).await?;

    let mut update = SaveCenter::from(&center);
    input.apply_to(&mut update, user.has_role(ROLE_DCC));

    let mut conn = state.pool.acquire().await?;
    let saved = CenterRepo::save(&mut conn, &update).await?;
    drop(conn);
    tracing::info!(center = %saved.uuid, subject = %user.subject, "Center updated");

    let geocoded = state.geocoding_worker().geocode_center(&saved).await?;
    Ok(Json(CenterDto::from(geocoded.as_ref().unwrap_or(&saved))))
}

/// DELETE /api/centers/{uuid}
pub async fn delete_center(
    user: AuthUser,
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let operator = current_operator(&state, &user).await?;
    let center = CenterRepo::find_by_uuid(&state.pool, uuid)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Center", uuid)))?;

    if center.operator_uuid != operator.uuid && !user.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Center belongs to another operator".into(),
        )));
    }

    CenterRepo::delete(&state.pool, uuid).await?;
    tracing::info!(center = %uuid, subject = %user.subject, "Center deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/centers/ref/{reference}
pub async fn get_by_reference(
    user: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<impl IntoResponse> {
    let operator = current_operator(&state, &user).await?;
    let center = CenterRepo::find_by_operator_and_user_reference(&state.pool, operator.uuid, &reference)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Center", &reference)))?;
    Ok(Json(CenterDto::from(&center)))
}

/// DELETE /api/centers/ref/{reference}
pub async fn delete_by_reference(
    user: AuthUser,
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<impl IntoResponse> {
    let operator = current_operator(&state, &user).await?;
    let deleted =
        CenterRepo::delete_by_operator_and_user_reference(&state.pool, operator.uuid, &reference).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::not_found("Center", &reference)));
    }
    tracing::info!(operator = %operator.uuid, reference = %reference, "Center deleted by reference");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// GET /api/centers/admin/csv
pub async fn export_csv(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rows = CenterRepo::find_all_for_export(&state.pool).await?;
    let body = write_centers_csv(&rows).map_err(|e| AppError::InternalError(e.to_string()))?;
    tracing::info!(rows = rows.len(), subject = %admin.subject, "Centers exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"centers.csv\""),
        ],
        body,
    ))
}

/// POST /api/centers/admin/geocode
///
/// Re-geocode every center in the background.
pub async fn geocode_all(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let uuids = CenterRepo::find_all_uuids(&state.pool).await?;
    tracing::info!(count = uuids.len(), subject = %admin.subject, "Geocoding of all centers requested");

    let worker = state.geocoding_worker();
    tokio::spawn(async move {
        let outcome = worker.run_batch(uuids).await;
        tracing::info!(updated = outcome.updated, skipped = outcome.skipped, missing = outcome.missing, "Geocoding of all centers finished");
    });

    Ok(StatusCode::ACCEPTED)
}
