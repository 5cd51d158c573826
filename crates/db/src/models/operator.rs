//! Operator entity model and DTOs.

use cwa_map_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `operators` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Operator {
    pub uuid: Uuid,
    /// Identity-provider subject claim.
    pub subject: String,
    pub name: String,
    pub operator_number: Option<String>,
    pub email: Option<String>,
    /// `"operator"` or `"center"`, see `cwa_map_core::bug_report`.
    pub report_receiver: String,
    #[serde(skip_serializing)]
    pub notification_token: Option<String>,
    pub notified: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Claims used to create an operator on first sight.
#[derive(Debug, Clone)]
pub struct NewOperator {
    pub subject: String,
    pub name: String,
    pub operator_number: Option<String>,
    pub email: Option<String>,
}

/// Self-service profile update.
#[derive(Debug, Clone)]
pub struct UpdateOperator {
    pub name: String,
    pub email: Option<String>,
    pub report_receiver: String,
}
