//! Center entity model and DTOs.

use cwa_map_core::center::{AppointmentType, Coordinates, TestKind};
use cwa_map_core::types::{Date, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `centers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Center {
    pub uuid: Uuid,
    pub operator_uuid: Uuid,
    pub user_reference: Option<String>,
    pub name: String,
    pub operator_name: Option<String>,
    pub lab_id: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: String,
    pub address_note: Option<String>,
    pub zip: Option<String>,
    pub region: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    /// Fixed coordinates are never overwritten by geocoding.
    pub coordinates_fixed: bool,
    pub opening_hours: Vec<String>,
    pub appointment: Option<String>,
    pub test_kinds: Vec<String>,
    pub dcc: Option<bool>,
    pub enter_date: Option<Date>,
    pub leave_date: Option<Date>,
    pub visible: bool,
    /// Last geocoding diagnostic.
    pub message: Option<String>,
    /// Immutable sampling rank in `[0, 1)`.
    pub ranking: f64,
    pub last_update: Timestamp,
    pub notified: Option<Timestamp>,
}

impl Center {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            longitude: self.longitude,
            latitude: self.latitude,
        }
    }
}

/// Input for [`CenterRepo::save`](crate::repositories::CenterRepo::save).
///
/// `ranking` and `last_update` are owned by the store and cannot be set.
#[derive(Debug, Clone)]
pub struct SaveCenter {
    /// `None` creates a new center unless the user reference is already taken.
    pub uuid: Option<Uuid>,
    pub operator_uuid: Uuid,
    pub user_reference: Option<String>,
    pub name: String,
    pub operator_name: Option<String>,
    pub lab_id: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: String,
    pub address_note: Option<String>,
    pub zip: Option<String>,
    pub region: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
    pub coordinates_fixed: bool,
    pub opening_hours: Vec<String>,
    pub appointment: Option<String>,
    pub test_kinds: Vec<String>,
    pub dcc: Option<bool>,
    pub enter_date: Option<Date>,
    pub leave_date: Option<Date>,
    pub visible: bool,
    pub message: Option<String>,
}

impl From<&Center> for SaveCenter {
    fn from(c: &Center) -> Self {
        Self {
            uuid: Some(c.uuid),
            operator_uuid: c.operator_uuid,
            user_reference: c.user_reference.clone(),
            name: c.name.clone(),
            operator_name: c.operator_name.clone(),
            lab_id: c.lab_id.clone(),
            email: c.email.clone(),
            website: c.website.clone(),
            address: c.address.clone(),
            address_note: c.address_note.clone(),
            zip: c.zip.clone(),
            region: c.region.clone(),
            longitude: c.longitude,
            latitude: c.latitude,
            coordinates_fixed: c.coordinates_fixed,
            opening_hours: c.opening_hours.clone(),
            appointment: c.appointment.clone(),
            test_kinds: c.test_kinds.clone(),
            dcc: c.dcc,
            enter_date: c.enter_date,
            leave_date: c.leave_date,
            visible: c.visible,
            message: c.message.clone(),
        }
    }
}

/// Optional narrowing of the public viewport query.
#[derive(Debug, Clone, Default)]
pub struct CenterFilter {
    /// Only `Some(true)` narrows; `false` means "don't care".
    pub dcc: Option<bool>,
    pub appointment: Option<AppointmentType>,
    pub test_kind: Option<TestKind>,
    /// Skip the freshness horizon.
    pub include_outdated: bool,
}

/// One page of an operator's centers.
#[derive(Debug, Clone, Serialize)]
pub struct CenterPage {
    pub count: i64,
    pub centers: Vec<Center>,
}

/// Totals reported by the statistics endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CenterStatistics {
    pub centers: i64,
    pub dcc: i64,
    pub invisible: i64,
    pub operators: i64,
}

/// A center joined with its operator, for the admin CSV export.
#[derive(Debug, Clone, FromRow)]
pub struct CenterExportRow {
    pub partner_subject: String,
    pub partner_uuid: Uuid,
    pub partner_name: String,
    pub partner_number: Option<String>,
    #[sqlx(flatten)]
    pub center: Center,
}
