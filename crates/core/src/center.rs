//! Center attribute vocabularies and invariants.
//!
//! Appointment types and test kinds are persisted as their canonical string
//! names (`"Required"`, `"PCR"`, ...) so that the store and the wire format
//! agree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Appointment type
// ---------------------------------------------------------------------------

/// Whether visitors need to book an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentType {
    Required,
    NotRequired,
    Possible,
}

impl AppointmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "Required",
            Self::NotRequired => "NotRequired",
            Self::Possible => "Possible",
        }
    }

    /// Case-insensitive parse of the canonical name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "required" => Some(Self::Required),
            "notrequired" => Some(Self::NotRequired),
            "possible" => Some(Self::Possible),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Test kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    Antigen,
    #[serde(rename = "PCR")]
    Pcr,
    Vaccination,
    Antibody,
}

impl TestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Antigen => "Antigen",
            Self::Pcr => "PCR",
            Self::Vaccination => "Vaccination",
            Self::Antibody => "Antibody",
        }
    }

    /// Case-insensitive parse of the canonical name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "antigen" => Some(Self::Antigen),
            "pcr" => Some(Self::Pcr),
            "vaccination" => Some(Self::Vaccination),
            "antibody" => Some(Self::Antibody),
            _ => None,
        }
    }
}

/// Convert test kinds into their stored string names, dropping duplicates.
pub fn test_kind_names(kinds: &[TestKind]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let name = kind.as_str().to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

/// A latitude/longitude rectangle given by its north-east and south-west
/// corners. Boxes crossing the antimeridian are not representable: with
/// `sw.longitude > ne.longitude` the box simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub ne: Coordinates,
    pub sw: Coordinates,
}

impl Bounds {
    pub fn contains(&self, point: &Coordinates) -> bool {
        point.latitude >= self.sw.latitude
            && point.latitude <= self.ne.latitude
            && point.longitude >= self.sw.longitude
            && point.longitude <= self.ne.longitude
    }
}

// ---------------------------------------------------------------------------
// Identity and ranking
// ---------------------------------------------------------------------------

/// Maximum length of a single opening-hours line.
pub const MAX_OPENING_HOURS_LINE: usize = 64;

/// Draw the immutable sampling rank for a newly created center.
pub fn new_ranking() -> f64 {
    rand::random::<f64>()
}

/// Decide which UUID a save targets.
///
/// `existing` is the center already holding the same `(operator,
/// user_reference)` pair, if any. A save that names a different UUID than the
/// holder of the reference conflicts; otherwise the holder's UUID is adopted.
/// `Ok(None)` means a new center is created.
pub fn resolve_center_uuid(
    incoming: Option<Uuid>,
    existing: Option<Uuid>,
    user_reference: Option<&str>,
) -> Result<Option<Uuid>, CoreError> {
    match (incoming, existing) {
        (Some(incoming), Some(existing)) if incoming != existing => Err(
            CoreError::DuplicateUserReference(user_reference.unwrap_or_default().to_string()),
        ),
        (_, Some(existing)) => Ok(Some(existing)),
        (incoming, None) => Ok(incoming),
    }
}

/// Trim a user reference, treating blank input as absent.
pub fn normalize_user_reference(reference: Option<&str>) -> Option<String> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
