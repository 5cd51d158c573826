pub mod centers;
pub mod health;
pub mod operators;
pub mod statistics;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /centers/                                  viewport search (public), bulk import
/// /centers/bounds                            address lookup (public)
/// /centers/all                               own centers, paged
/// /centers/csv                               CSV import preview
/// /centers/admin/csv                         CSV export (admin)
/// /centers/admin/geocode                     geocode all centers (admin)
/// /centers/ref/{reference}                   get, delete by user reference
/// /centers/{uuid}                            get, update, delete
/// /centers/{uuid}/report                     submit bug report (public)
///
/// /operators/                                list (admin)
/// /operators/current                         get, update own profile
/// /operators/{id}                            delete (admin)
/// /operators/notification/confirm            confirm reminder (public)
///
/// /statistics/reports                        report counters (admin)
/// /statistics/centers                        center and search totals (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/centers", centers::router())
        // Clients call the collection with a trailing slash.
        .route(
            "/centers/",
            get(handlers::centers::find_centers).post(handlers::centers::import_centers),
        )
        .nest("/operators", operators::router())
        .route("/operators/", get(handlers::operators::list))
        .nest("/statistics", statistics::router())
}
