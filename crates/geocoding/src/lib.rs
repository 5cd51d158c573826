//! Address to coordinate resolution.
//!
//! [`Geocoder`] is the provider seam; [`GoogleGeocoder`] talks to the Google
//! Geocoding API. [`worker`] applies lookups to stored centers.

pub mod google;
pub mod worker;

use async_trait::async_trait;
use cwa_map_core::center::{Bounds, Coordinates};

pub use google::{GoogleGeocoder, GoogleGeocoderConfig};
pub use worker::GeocodingWorker;

/// Errors from a geocoding lookup.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("no results")]
    NoResult,

    /// Several candidates and none of them is a street address.
    #[error("too many results")]
    TooManyResults,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-OK status.
    #[error("geocoder returned {status}: {message}")]
    Status { status: String, message: String },
}

impl GeocodeError {
    /// `true` for answers about the address itself, as opposed to transport
    /// or provider failures.
    pub fn is_address_problem(&self) -> bool {
        matches!(self, Self::NoResult | Self::TooManyResults)
    }
}

/// A single resolved address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub formatted_address: String,
    /// Recommended viewport for displaying the result.
    pub bounds: Bounds,
    pub location: Coordinates,
    /// `administrative_area_level_1` as reported by the provider.
    pub region: Option<String>,
    pub zip: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve postal codes, cities or complete addresses.
    async fn lookup(&self, address: &str) -> Result<GeocodeResult, GeocodeError>;
}
