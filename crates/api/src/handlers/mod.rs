pub mod centers;
pub mod operators;
pub mod statistics;

use cwa_map_db::models::operator::{NewOperator, Operator};
use cwa_map_db::repositories::OperatorRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// The operator behind the caller's token, created on first use.
pub(crate) async fn current_operator(state: &AppState, user: &AuthUser) -> AppResult<Operator> {
    let input = NewOperator {
        subject: user.subject.clone(),
        name: user.name.clone().unwrap_or_default(),
        operator_number: user.username.clone(),
        email: user.email.clone(),
    };
    Ok(OperatorRepo::get_or_create(&state.pool, &input).await?)
}
