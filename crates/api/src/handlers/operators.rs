//! Handlers for `/api/operators`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use cwa_map_core::error::CoreError;
use cwa_map_db::models::operator::UpdateOperator;
use cwa_map_db::repositories::OperatorRepo;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dto::operator::{OperatorDto, UpdateOperatorRequest};
use crate::error::{AppError, AppResult};
use crate::handlers::current_operator;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
}

/// GET /api/operators/current
pub async fn get_current(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let operator = current_operator(&state, &user).await?;
    Ok(Json(OperatorDto::from(&operator)))
}

/// PUT /api/operators/current
pub async fn update_current(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateOperatorRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let operator = current_operator(&state, &user).await?;

    let updated = OperatorRepo::update(&state.pool, operator.uuid, &UpdateOperator::from(input))
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Operator", operator.uuid)))?;

    tracing::info!(operator = %updated.uuid, receiver = %updated.report_receiver, "Operator updated");
    Ok(Json(OperatorDto::from(&updated)))
}

/// GET /api/operators/
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let operators = OperatorRepo::list(&state.pool).await?;
    Ok(Json(operators.iter().map(OperatorDto::from).collect::<Vec<_>>()))
}

/// DELETE /api/operators/{id}
///
/// Removes the operator together with all of its centers.
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    if !OperatorRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::not_found("Operator", id)));
    }
    tracing::info!(operator = %id, subject = %admin.subject, "Operator deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/operators/notification/confirm?token=...
///
/// Clears the pending token from a stale-center reminder.
pub async fn confirm_notification(
    State(state): State<AppState>,
    Query(params): Query<ConfirmQuery>,
) -> AppResult<impl IntoResponse> {
    if !OperatorRepo::confirm_notification(&state.pool, &params.token).await? {
        return Err(AppError::Core(CoreError::not_found("Notification token", "for this link")));
    }
    Ok(StatusCode::NO_CONTENT)
}
