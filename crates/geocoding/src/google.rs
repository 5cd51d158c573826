//! Client for the Google Geocoding API.

use async_trait::async_trait;
use cwa_map_core::center::{Bounds, Coordinates};
use serde::Deserialize;

use crate::{GeocodeError, GeocodeResult, Geocoder};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Debug, Clone)]
pub struct GoogleGeocoderConfig {
    pub api_key: String,
    /// ISO country code used both as region bias and as a hard component
    /// filter.
    pub country: String,
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    config: GoogleGeocoderConfig,
}

impl GoogleGeocoder {
    pub fn new(config: GoogleGeocoderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn lookup(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        tracing::debug!(address, "Geocoding address");

        let components = format!("country:{}", self.config.country);
        let response: GeocodeResponse = self
            .client
            .get(GEOCODE_URL)
            .query(&[
                ("address", address),
                ("region", self.config.country.as_str()),
                ("components", components.as_str()),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.status.as_str() {
            "OK" => narrow_results(response.results),
            "ZERO_RESULTS" => Err(GeocodeError::NoResult),
            _ => Err(GeocodeError::Status {
                status: response.status,
                message: response.error_message.unwrap_or_default(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<ApiResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    formatted_address: String,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
    viewport: Viewport,
}

#[derive(Debug, Deserialize)]
struct Viewport {
    northeast: LatLng,
    southwest: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for Coordinates {
    fn from(p: LatLng) -> Self {
        Coordinates {
            longitude: p.lng,
            latitude: p.lat,
        }
    }
}

impl ApiResult {
    fn component(&self, kind: &str) -> Option<String> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    }
}

/// Pick the single usable result: the only one, or else the first
/// `street_address` among several.
fn narrow_results(results: Vec<ApiResult>) -> Result<GeocodeResult, GeocodeError> {
    let result = match results.len() {
        0 => return Err(GeocodeError::NoResult),
        1 => results.into_iter().next(),
        _ => results
            .into_iter()
            .find(|r| r.types.iter().any(|t| t == "street_address")),
    }
    .ok_or(GeocodeError::TooManyResults)?;

    Ok(GeocodeResult {
        region: result.component("administrative_area_level_1"),
        zip: result.component("postal_code"),
        bounds: Bounds {
            ne: result.geometry.viewport.northeast.into(),
            sw: result.geometry.viewport.southwest.into(),
        },
        location: result.geometry.location.into(),
        formatted_address: result.formatted_address,
    })
}
