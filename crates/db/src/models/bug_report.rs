//! Queued bug reports and their counters.

use cwa_map_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `bug_reports` table.
///
/// Center name and address are copied at submission so the report stays
/// readable after the center is deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BugReport {
    pub uuid: Uuid,
    pub created: Timestamp,
    pub receiver: String,
    pub operator_uuid: Uuid,
    pub center_uuid: Uuid,
    pub center_name: String,
    pub center_address: String,
    pub subject: String,
    pub message: Option<String>,
    /// Token of the publish cycle currently owning the row.
    #[serde(skip_serializing)]
    pub lease: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewBugReport {
    pub receiver: String,
    pub operator_uuid: Uuid,
    pub center_uuid: Uuid,
    pub center_name: String,
    pub center_address: String,
    pub subject: String,
    pub message: Option<String>,
}

/// Everything the intake path needs to know about a center and its operator.
#[derive(Debug, Clone, FromRow)]
pub struct ReportTarget {
    pub center_uuid: Uuid,
    pub center_name: String,
    pub center_address: String,
    pub center_email: Option<String>,
    pub operator_uuid: Uuid,
    pub operator_email: Option<String>,
    pub report_receiver: String,
}

/// A row from `report_statistics`, joined with the operator name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReportStatistic {
    pub operator_uuid: Uuid,
    pub operator_name: Option<String>,
    pub subject: String,
    pub count: i64,
}
