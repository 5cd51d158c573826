//! CSV export of every center joined with its operator.
//!
//! The file is `;`-separated and starts with a UTF-8 byte order mark so that
//! spreadsheet tools pick the right encoding.

use cwa_map_core::region::translate_region;
use cwa_map_db::models::center::CenterExportRow;

use crate::dto::center::format_date;

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub const HEADERS: [&str; 23] = [
    "partner_subject",
    "partner_uuid",
    "partner_name",
    "partner_number",
    "user_reference",
    "operator_name",
    "lab_id",
    "center_uuid",
    "center_name",
    "email",
    "address",
    "zip",
    "region",
    "dcc",
    "enter_date",
    "leave_date",
    "testkinds",
    "appointment",
    "longitude",
    "latitude",
    "message",
    "last_update",
    "visible",
];

/// Render `rows` as the admin CSV export.
pub fn write_centers_csv(rows: &[CenterExportRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(BOM.to_vec());
    writer.write_record(HEADERS)?;

    for row in rows {
        let c = &row.center;
        writer.write_record([
            row.partner_subject.clone(),
            row.partner_uuid.to_string(),
            row.partner_name.clone(),
            row.partner_number.clone().unwrap_or_default(),
            c.user_reference.clone().unwrap_or_default(),
            c.operator_name.clone().unwrap_or_default(),
            c.lab_id.clone().unwrap_or_default(),
            c.uuid.to_string(),
            c.name.clone(),
            c.email.clone().unwrap_or_default(),
            c.address.clone(),
            c.zip.clone().unwrap_or_default(),
            c.region
                .as_deref()
                .map(translate_region)
                .unwrap_or_default()
                .to_string(),
            c.dcc.map(|d| d.to_string()).unwrap_or_default(),
            format_date(c.enter_date).unwrap_or_default(),
            format_date(c.leave_date).unwrap_or_default(),
            c.test_kinds.join(","),
            c.appointment.clone().unwrap_or_default(),
            format!("{:.10}", c.longitude),
            format!("{:.10}", c.latitude),
            c.message.clone().unwrap_or_default(),
            c.last_update.to_rfc3339(),
            c.visible.to_string(),
        ])?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}
