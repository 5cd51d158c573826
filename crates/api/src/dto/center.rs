use cwa_map_core::center::{
    normalize_user_reference, test_kind_names, AppointmentType, Coordinates, TestKind,
    MAX_OPENING_HOURS_LINE,
};
use cwa_map_core::csv_import::{ImportRow, ImportedCenter};
use cwa_map_core::types::{Date, Timestamp};
use cwa_map_db::models::center::{Center, SaveCenter};
use cwa_map_geocoding::GeocodeResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Wire format of calendar dates.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

pub fn format_date(date: Option<Date>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

/// Parse a wire date; blank or malformed input is absent.
pub fn parse_date(value: Option<&str>) -> Option<Date> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| Date::parse_from_str(v, DATE_FORMAT).ok())
}

// ---------------------------------------------------------------------------
// Public search
// ---------------------------------------------------------------------------

/// What the public map shows for one center.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterSummary {
    pub uuid: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub coordinates: Coordinates,
    pub address: String,
    pub opening_hours: Vec<String>,
    pub address_note: Option<String>,
    pub appointment: Option<String>,
    pub test_kinds: Vec<String>,
    pub dcc: Option<bool>,
}

impl From<&Center> for CenterSummary {
    fn from(c: &Center) -> Self {
        Self {
            uuid: c.uuid,
            name: c.name.clone(),
            email: c.email.clone(),
            website: c.website.clone(),
            coordinates: c.coordinates(),
            address: c.address.clone(),
            opening_hours: c.opening_hours.clone(),
            address_note: c.address_note.clone(),
            appointment: c.appointment.clone(),
            test_kinds: c.test_kinds.clone(),
            dcc: c.dcc,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindCentersResponse {
    pub centers: Vec<CenterSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsDto {
    pub north_east: Coordinates,
    pub south_west: Coordinates,
}

/// Answer of the address lookup used to move the map.
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeResponse {
    pub address: String,
    pub bounds: BoundsDto,
}

impl From<GeocodeResult> for GeocodeResponse {
    fn from(result: GeocodeResult) -> Self {
        Self {
            address: result.formatted_address,
            bounds: BoundsDto {
                north_east: result.bounds.ne,
                south_west: result.bounds.sw,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Operator views
// ---------------------------------------------------------------------------

/// A center as seen by its operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterDto {
    #[serde(flatten)]
    pub summary: CenterSummary,
    pub user_reference: Option<String>,
    pub operator_name: Option<String>,
    pub lab_id: Option<String>,
    pub zip: Option<String>,
    pub region: Option<String>,
    pub coordinates_fixed: bool,
    pub enter_date: Option<String>,
    pub leave_date: Option<String>,
    /// Last geocoding diagnostic.
    pub message: Option<String>,
    pub visible: bool,
    pub last_update: Timestamp,
}

impl From<&Center> for CenterDto {
    fn from(c: &Center) -> Self {
        Self {
            summary: CenterSummary::from(c),
            user_reference: c.user_reference.clone(),
            operator_name: c.operator_name.clone(),
            lab_id: c.lab_id.clone(),
            zip: c.zip.clone(),
            region: c.region.clone(),
            coordinates_fixed: c.coordinates_fixed,
            enter_date: format_date(c.enter_date),
            leave_date: format_date(c.leave_date),
            message: c.message.clone(),
            visible: c.visible,
            last_update: c.last_update,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageCenterDto {
    pub count: i64,
    pub result: Vec<CenterDto>,
}

// ---------------------------------------------------------------------------
// Edit / import input
// ---------------------------------------------------------------------------

/// Editable fields of a center, used for updates, bulk import and the CSV
/// preview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct EditCenterDto {
    pub user_reference: Option<String>,
    #[validate(length(min = 1, code = "required"))]
    pub name: String,
    pub operator_name: Option<String>,
    pub lab_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub website: Option<String>,
    #[validate(length(min = 1, code = "required"))]
    pub address: String,
    pub address_note: Option<String>,
    #[validate(custom(function = "validate_opening_hours"))]
    pub opening_hours: Vec<String>,
    pub appointment: Option<AppointmentType>,
    pub test_kinds: Vec<TestKind>,
    pub dcc: Option<bool>,
    /// `dd.mm.yyyy`; unparsable dates are ignored.
    pub enter_date: Option<String>,
    pub leave_date: Option<String>,
    /// Absent means visible.
    pub visible: Option<bool>,
    /// Coordinates that geocoding must not overwrite.
    pub fixed_coordinates: Option<Coordinates>,
}

fn validate_opening_hours(lines: &[String]) -> Result<(), ValidationError> {
    if lines.iter().any(|l| l.chars().count() > MAX_OPENING_HOURS_LINE) {
        return Err(ValidationError::new("max"));
    }
    Ok(())
}

impl EditCenterDto {
    /// A save input for a center created (or matched by reference) under
    /// `operator_uuid`.
    pub fn to_new_center(&self, operator_uuid: Uuid, may_set_dcc: bool) -> SaveCenter {
        let mut center = SaveCenter {
            uuid: None,
            operator_uuid,
            user_reference: None,
            name: String::new(),
            operator_name: None,
            lab_id: None,
            email: None,
            website: None,
            address: String::new(),
            address_note: None,
            zip: None,
            region: None,
            longitude: 0.0,
            latitude: 0.0,
            coordinates_fixed: false,
            opening_hours: Vec::new(),
            appointment: None,
            test_kinds: Vec::new(),
            dcc: None,
            enter_date: None,
            leave_date: None,
            visible: true,
            message: None,
        };
        self.apply_to(&mut center, may_set_dcc);
        center
    }

    /// Overwrite the editable fields of `center`.
    ///
    /// Callers without the `dcc` role cannot mark a center as DCC capable.
    pub fn apply_to(&self, center: &mut SaveCenter, may_set_dcc: bool) {
        center.user_reference = normalize_user_reference(self.user_reference.as_deref());
        center.name = self.name.trim().to_string();
        center.operator_name = non_blank(&self.operator_name);
        center.lab_id = non_blank(&self.lab_id);
        center.email = non_blank(&self.email);
        center.website = non_blank(&self.website);
        center.address = self.address.trim().to_string();
        center.address_note = non_blank(&self.address_note);
        center.opening_hours = self.opening_hours.clone();
        center.appointment = self.appointment.map(|a| a.as_str().to_string());
        center.test_kinds = test_kind_names(&self.test_kinds);
        center.dcc = if may_set_dcc { self.dcc } else { Some(false) };
        center.enter_date = parse_date(self.enter_date.as_deref());
        center.leave_date = parse_date(self.leave_date.as_deref());
        center.visible = self.visible.unwrap_or(true);
        if let Some(coordinates) = self.fixed_coordinates {
            center.longitude = coordinates.longitude;
            center.latitude = coordinates.latitude;
            center.coordinates_fixed = true;
        }
    }
}

impl From<&ImportedCenter> for EditCenterDto {
    fn from(c: &ImportedCenter) -> Self {
        Self {
            user_reference: c.user_reference.clone(),
            name: c.name.clone(),
            operator_name: c.operator_name.clone(),
            lab_id: c.lab_id.clone(),
            email: c.email.clone(),
            website: c.website.clone(),
            address: c.address.clone(),
            address_note: c.address_note.clone(),
            opening_hours: c.opening_hours.clone(),
            appointment: c.appointment,
            test_kinds: c.test_kinds.clone(),
            dcc: Some(c.dcc),
            enter_date: format_date(c.enter_date),
            leave_date: format_date(c.leave_date),
            visible: Some(c.visible),
            fixed_coordinates: c.fixed_coordinates,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Body of the bulk import.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportCentersRequest {
    pub centers: Vec<EditCenterDto>,
    /// Remove all of the operator's centers first.
    pub delete_all: bool,
}

/// One row of the CSV preview.
#[derive(Debug, Clone, Serialize)]
pub struct ImportPreviewRow {
    pub center: EditCenterDto,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<ImportRow> for ImportPreviewRow {
    fn from(row: ImportRow) -> Self {
        Self {
            center: EditCenterDto::from(&row.center),
            errors: row.errors,
            warnings: row.warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBugReportRequest {
    #[validate(length(min = 1, max = 160))]
    pub subject: String,
    #[validate(length(max = 160))]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
