//! Parser for operator center spreadsheets.
//!
//! Operators upload `;`-separated exports with German column headers. The
//! header may span the first two rows; every header cell found in either row
//! is mapped to its column index. Each remaining non-empty row becomes an
//! [`ImportRow`] carrying the parsed center plus row-level errors (the row must
//! not be imported) and warnings (the row is imported with defaults).

use std::collections::HashMap;
use std::io::Read;

use serde::Serialize;

use crate::center::{normalize_user_reference, AppointmentType, Coordinates, TestKind};
use crate::error::CoreError;
use crate::types::Date;

// ---------------------------------------------------------------------------
// Column headers
// ---------------------------------------------------------------------------

const COL_PARTNER_ID: &str = "Partner ID";
const COL_USER_REFERENCE: &str = "NR.";
const COL_NAME: &str = "Name der Teststelle";
const COL_OPERATOR_NAME: &str = "Name des Betreibers";
const COL_LAB_ID: &str = "Lab ID";
const COL_STREET: &str = "Straße";
const COL_HOUSE_NUMBER: &str = "Hausnr.";
const COL_ZIP: &str = "PLZ";
const COL_CITY: &str = "Ort";
const COL_ENTER_DATE: &str = "Eintrittsdatum";
const COL_LEAVE_DATE: &str = "Austrittsdatum";
const COL_EMAIL: &str = "E-Mail";
const COL_OPENING_HOURS: &str = "Öffnungszeiten";
const COL_APPOINTMENT: &str = "Terminbuchung";
const COL_TEST_KINDS: &str = "Testmöglichkeiten";
const COL_WEBSITE: &str = "Webseite";
const COL_DCC: &str = "Ausstellung eines Dicital Covid Zertifikates (DCC)";
const COL_NOTE: &str = "Adresshinweis";
const COL_VISIBLE: &str = "Sichtbar";
const COL_LATITUDE: &str = "Breitengrad";
const COL_LONGITUDE: &str = "Längengrad";

const KNOWN_COLUMNS: &[&str] = &[
    COL_PARTNER_ID,
    COL_USER_REFERENCE,
    COL_NAME,
    COL_OPERATOR_NAME,
    COL_LAB_ID,
    COL_STREET,
    COL_HOUSE_NUMBER,
    COL_ZIP,
    COL_CITY,
    COL_ENTER_DATE,
    COL_LEAVE_DATE,
    COL_EMAIL,
    COL_OPENING_HOURS,
    COL_APPOINTMENT,
    COL_TEST_KINDS,
    COL_WEBSITE,
    COL_DCC,
    COL_NOTE,
    COL_VISIBLE,
    COL_LATITUDE,
    COL_LONGITUDE,
];

const REQUIRED_COLUMNS: &[&str] = &[COL_NAME, COL_STREET, COL_EMAIL];

/// Number of leading rows scanned for header cells.
const HEADER_ROWS: usize = 2;

const DATE_FORMAT: &str = "%d.%m.%Y";

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A center as read from one spreadsheet row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedCenter {
    pub user_reference: Option<String>,
    pub name: String,
    pub operator_name: Option<String>,
    pub lab_id: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub address: String,
    pub address_note: Option<String>,
    pub opening_hours: Vec<String>,
    pub appointment: Option<AppointmentType>,
    pub test_kinds: Vec<TestKind>,
    pub dcc: bool,
    pub visible: bool,
    pub enter_date: Option<Date>,
    pub leave_date: Option<Date>,
    /// Present only when the row carries explicit, non-zero coordinates;
    /// such coordinates are never overwritten by geocoding.
    pub fixed_coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportRow {
    pub center: ImportedCenter,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Columns(HashMap<&'static str, usize>);

impl Columns {
    fn scan(&mut self, record: &csv::StringRecord) {
        for (index, cell) in record.iter().enumerate() {
            let cell = cell.trim();
            if let Some(known) = KNOWN_COLUMNS.iter().find(|c| **c == cell) {
                self.0.insert(known, index);
            }
        }
    }

    fn ensure_required(&self) -> Result<(), CoreError> {
        for column in REQUIRED_COLUMNS {
            if !self.0.contains_key(column) {
                return Err(CoreError::Validation(format!("column {column} not found")));
            }
        }
        Ok(())
    }

    /// Trimmed cell of `column`, or `None` when the column is absent.
    fn cell<'r>(&self, record: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        self.0
            .get(column)
            .map(|index| record.get(*index).unwrap_or("").trim())
    }

    /// Trimmed, non-empty cell of `column`.
    fn text(&self, record: &csv::StringRecord, column: &str) -> Option<String> {
        self.cell(record, column)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Parse a spreadsheet export into preview rows. Nothing is persisted.
pub fn parse_centers<R: Read>(reader: R) -> Result<Vec<ImportRow>, CoreError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut columns = Columns(HashMap::new());
    let mut header_rows = 0;
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(CoreError::Internal(format!("failed to read csv: {e}")));
            }
            // Malformed rows are skipped.
            Err(_) => continue,
        };

        if header_rows < HEADER_ROWS {
            header_rows += 1;
            columns.scan(&record);
            if header_rows == HEADER_ROWS {
                columns.ensure_required()?;
            }
            continue;
        }

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        rows.push(parse_row(&record, &columns));
    }

    if header_rows < HEADER_ROWS {
        columns.ensure_required()?;
    }

    Ok(rows)
}

fn parse_row(record: &csv::StringRecord, columns: &Columns) -> ImportRow {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let appointment = match columns.cell(record, COL_APPOINTMENT) {
        Some(value) => parse_appointment(value).unwrap_or_else(|e| {
            warnings.push(e);
            None
        }),
        None => None,
    };

    let test_kinds = match columns.cell(record, COL_TEST_KINDS) {
        Some(value) => {
            let (kinds, invalid) = parse_test_kinds(value);
            if let Some(invalid) = invalid {
                warnings.push(invalid);
            } else if kinds.is_empty() {
                warnings.push("no valid testkinds found".to_string());
            }
            kinds
        }
        None => Vec::new(),
    };

    let enter_date = parse_date_cell(columns.cell(record, COL_ENTER_DATE), &mut errors);
    let leave_date = parse_date_cell(columns.cell(record, COL_LEAVE_DATE), &mut errors);

    let latitude = parse_coordinate(columns.cell(record, COL_LATITUDE));
    let longitude = parse_coordinate(columns.cell(record, COL_LONGITUDE));
    let fixed_coordinates = (latitude != 0.0 && longitude != 0.0).then_some(Coordinates {
        longitude,
        latitude,
    });

    let center = ImportedCenter {
        user_reference: normalize_user_reference(columns.cell(record, COL_USER_REFERENCE)),
        name: columns.text(record, COL_NAME).unwrap_or_default(),
        operator_name: columns.text(record, COL_OPERATOR_NAME),
        lab_id: columns.text(record, COL_LAB_ID),
        email: non_null(columns.cell(record, COL_EMAIL)),
        website: non_null(columns.cell(record, COL_WEBSITE)),
        address: parse_address(record, columns),
        address_note: columns.text(record, COL_NOTE),
        opening_hours: columns
            .cell(record, COL_OPENING_HOURS)
            .map(parse_opening_hours)
            .unwrap_or_default(),
        appointment,
        test_kinds,
        dcc: is_yes(columns.cell(record, COL_DCC)),
        visible: columns.cell(record, COL_VISIBLE).map_or(true, |v| is_yes(Some(v))),
        enter_date,
        leave_date,
        fixed_coordinates,
    };

    if center.name.is_empty() {
        errors.push("name is required".to_string());
    }
    if center.address.is_empty() {
        errors.push("address is required".to_string());
    }
    if let Some(email) = &center.email {
        if !email.contains('@') {
            errors.push(format!("invalid email: {email}"));
        }
    }

    ImportRow {
        center,
        errors,
        warnings,
    }
}

/// `"<street> <house number>, <zip> <city>"`, zero-padding four-digit zips.
fn parse_address(record: &csv::StringRecord, columns: &Columns) -> String {
    let mut address = columns.cell(record, COL_STREET).unwrap_or("").to_string();
    let house_number = columns.cell(record, COL_HOUSE_NUMBER).unwrap_or("");
    let mut zip = columns.cell(record, COL_ZIP).unwrap_or("").to_string();
    let city = columns.cell(record, COL_CITY).unwrap_or("");

    if zip.chars().count() == 4 {
        zip.insert(0, '0');
    }
    if !house_number.is_empty() {
        address.push(' ');
        address.push_str(house_number);
    }
    if !zip.is_empty() || !city.is_empty() {
        address.push_str(", ");
        address.push_str(format!("{zip} {city}").trim());
    }
    address
}

fn parse_opening_hours(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    let separator = if value.contains('|') { '|' } else { '\n' };
    value
        .split(separator)
        .map(|line| line.trim().to_string())
        .collect()
}

fn parse_appointment(value: &str) -> Result<Option<AppointmentType>, String> {
    match value.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "möglich" => Ok(Some(AppointmentType::Possible)),
        "nicht erforderlich" | "nicht notwendig" => Ok(Some(AppointmentType::NotRequired)),
        "erforderlich" => Ok(Some(AppointmentType::Required)),
        _ => Err("invalid appointment type".to_string()),
    }
}

/// Comma-separated free text. Returns the recognised kinds and the warning for
/// the last unrecognised element, if any.
fn parse_test_kinds(value: &str) -> (Vec<TestKind>, Option<String>) {
    let mut kinds = Vec::new();
    let mut invalid = None;
    for element in value.split(',') {
        let element = element.trim().to_lowercase();
        if element.is_empty() {
            continue;
        }
        if element.contains("antigen") || element.contains("schnelltest") {
            kinds.push(TestKind::Antigen);
        } else if element.contains("pcr") {
            kinds.push(TestKind::Pcr);
        } else if element.contains("impfung") {
            kinds.push(TestKind::Vaccination);
        } else {
            invalid = Some(format!("invalid testkind: {element}"));
        }
    }
    (kinds, invalid)
}

fn parse_date_cell(value: Option<&str>, errors: &mut Vec<String>) -> Option<Date> {
    let value = value.filter(|v| !v.is_empty())?;
    match Date::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(format!("invalid date: {value}"));
            None
        }
    }
}

fn parse_coordinate(value: Option<&str>) -> f64 {
    value.and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0)
}

fn non_null(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn is_yes(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.to_lowercase() == "ja")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "NR.;Name der Teststelle;Straße;Hausnr.;PLZ;Ort;E-Mail;\
        Terminbuchung;Testmöglichkeiten;Öffnungszeiten;Sichtbar;\
        Ausstellung eines Dicital Covid Zertifikates (DCC);Eintrittsdatum;Breitengrad;Längengrad\n";

    fn parse(body: &str) -> Vec<ImportRow> {
        let input = format!("{HEADER};;;;;;;;;;;;;;\n{body}");
        parse_centers(input.as_bytes()).unwrap()
    }

    #[test]
    fn parses_complete_row() {
        let rows = parse(
            "A-1;Testzentrum Mitte;Hauptstraße;5;1067;Dresden;info@example.org;\
             möglich;Schnelltest, PCR;Mo-Fr 8-18|Sa 9-12;ja;Ja;1.3.2021;51.05;13.74\n",
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert!(row.errors.is_empty(), "{:?}", row.errors);
        assert!(row.warnings.is_empty(), "{:?}", row.warnings);

        let c = &row.center;
        assert_eq!(c.user_reference.as_deref(), Some("A-1"));
        assert_eq!(c.address, "Hauptstraße 5, 01067 Dresden");
        assert_eq!(c.appointment, Some(AppointmentType::Possible));
        assert_eq!(c.test_kinds, vec![TestKind::Antigen, TestKind::Pcr]);
        assert_eq!(c.opening_hours, vec!["Mo-Fr 8-18", "Sa 9-12"]);
        assert!(c.visible);
        assert!(c.dcc);
        assert_eq!(c.enter_date, NaiveDate::from_ymd_opt(2021, 3, 1));
        assert_eq!(
            c.fixed_coordinates,
            Some(Coordinates { longitude: 13.74, latitude: 51.05 })
        );
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let input = "Name der Teststelle;Straße\n;\nfoo;bar\n";
        let err = parse_centers(input.as_bytes()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg == "column E-Mail not found"));
    }

    #[test]
    fn header_may_span_two_rows() {
        let input = "Name der Teststelle;;\n;Straße;E-Mail\nZentrum;Weg 1;null\n";
        let rows = parse_centers(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].center.name, "Zentrum");
        assert_eq!(rows[0].center.address, "Weg 1");
        assert_eq!(rows[0].center.email, None);
    }

    #[test]
    fn empty_lines_are_skipped() {
        let rows = parse(";;;;;;;;;;;;;;\nx;Zentrum;Weg;1;;;a@b.de;;;;;;;;\n");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn invalid_values_produce_warnings_and_errors() {
        let rows = parse("x;Zentrum;Weg;1;;;a@b.de;vielleicht;Blutspende;;nein;;31.31.2021;;\n");
        let row = &rows[0];
        assert_eq!(row.warnings, vec!["invalid appointment type", "invalid testkind: blutspende"]);
        assert_eq!(row.errors, vec!["invalid date: 31.31.2021"]);
        assert!(!row.center.visible);
        assert!(!row.center.dcc);
        assert_eq!(row.center.fixed_coordinates, None);
    }

    #[test]
    fn empty_test_kinds_warns() {
        let rows = parse("x;Zentrum;Weg;1;;;a@b.de;erforderlich;;;;;;;\n");
        assert_eq!(rows[0].warnings, vec!["no valid testkinds found"]);
        assert_eq!(rows[0].center.appointment, Some(AppointmentType::Required));
    }

    #[test]
    fn missing_name_is_an_error() {
        let rows = parse("x;;Weg;1;;;a@b.de;;Impfung;;;;;;\n");
        assert_eq!(rows[0].errors, vec!["name is required"]);
        assert_eq!(rows[0].center.test_kinds, vec![TestKind::Vaccination]);
    }

    #[test]
    fn opening_hours_fall_back_to_newlines() {
        assert_eq!(parse_opening_hours("Mo 8-12\nDi 9-13"), vec!["Mo 8-12", "Di 9-13"]);
        assert!(parse_opening_hours("").is_empty());
    }

    #[test]
    fn appointment_synonyms() {
        assert_eq!(parse_appointment("Nicht notwendig"), Ok(Some(AppointmentType::NotRequired)));
        assert_eq!(parse_appointment("nicht erforderlich"), Ok(Some(AppointmentType::NotRequired)));
        assert_eq!(parse_appointment(""), Ok(None));
    }
}
