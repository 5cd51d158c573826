//! Admin statistics: report counters, center totals and search counters.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use cwa_map_db::models::bug_report::ReportStatistic;
use cwa_map_db::models::center::CenterStatistics;
use cwa_map_db::repositories::{BugReportRepo, CenterRepo};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::metrics::SearchMetricsSnapshot;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatisticDto {
    pub operator_uuid: Uuid,
    pub operator_name: Option<String>,
    pub subject: String,
    pub report_count: i64,
}

impl From<ReportStatistic> for ReportStatisticDto {
    fn from(s: ReportStatistic) -> Self {
        Self {
            operator_uuid: s.operator_uuid,
            operator_name: s.operator_name,
            subject: s.subject,
            report_count: s.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CenterStatisticsResponse {
    #[serde(flatten)]
    pub centers: CenterStatistics,
    pub search: SearchMetricsSnapshot,
}

/// GET /api/statistics/reports
pub async fn reports(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stats = BugReportRepo::list_statistics(&state.pool).await?;
    Ok(Json(
        stats.into_iter().map(ReportStatisticDto::from).collect::<Vec<_>>(),
    ))
}

/// GET /api/statistics/centers
pub async fn centers(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let centers = CenterRepo::find_statistics(&state.pool).await?;
    Ok(Json(CenterStatisticsResponse {
        centers,
        search: state.metrics.snapshot(),
    }))
}
