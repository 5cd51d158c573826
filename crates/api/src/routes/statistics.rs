//! Route definitions for the `/statistics` resource. Admin only.

use axum::routing::get;
use axum::Router;

use crate::handlers::statistics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(statistics::reports))
        .route("/centers", get(statistics::centers))
}
