//! Route definitions for the `/centers` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::centers;
use crate::state::AppState;

/// Routes mounted at `/centers`.
///
/// ```text
/// GET    /                    -> find_centers (public)
/// POST   /                    -> import_centers
/// GET    /bounds              -> geocode_address (public)
/// GET    /all                 -> list_own
/// POST   /csv                 -> preview_csv
/// GET    /admin/csv           -> export_csv (admin)
/// POST   /admin/geocode       -> geocode_all (admin)
/// GET    /ref/{reference}     -> get_by_reference
/// DELETE /ref/{reference}     -> delete_by_reference
/// GET    /{uuid}              -> get_center
/// PUT    /{uuid}              -> update_center
/// DELETE /{uuid}              -> delete_center
/// POST   /{uuid}/report       -> submit_report (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(centers::find_centers).post(centers::import_centers))
        .route("/bounds", get(centers::geocode_address))
        .route("/all", get(centers::list_own))
        .route("/csv", post(centers::preview_csv))
        // Admin
        .route("/admin/csv", get(centers::export_csv))
        .route("/admin/geocode", post(centers::geocode_all))
        // Lookup by the operator's own reference
        .route(
            "/ref/{reference}",
            get(centers::get_by_reference).delete(centers::delete_by_reference),
        )
        .route(
            "/{uuid}",
            put(centers::update_center)
                .get(centers::get_center)
                .delete(centers::delete_center),
        )
        .route("/{uuid}/report", post(centers::submit_report))
}
