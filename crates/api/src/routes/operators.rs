//! Route definitions for the `/operators` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::operators;
use crate::state::AppState;

/// Routes mounted at `/operators`.
///
/// ```text
/// GET    /                        -> list (admin)
/// GET    /current                 -> get_current
/// PUT    /current                 -> update_current
/// DELETE /{id}                    -> delete (admin)
/// POST   /notification/confirm    -> confirm_notification (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(operators::list))
        .route(
            "/current",
            get(operators::get_current).put(operators::update_current),
        )
        .route("/{id}", delete(operators::delete))
        .route("/notification/confirm", post(operators::confirm_notification))
}
