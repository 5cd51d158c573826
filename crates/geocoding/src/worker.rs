//! Applies geocoder answers to stored centers.
//!
//! Successful lookups update zip, region and (unless fixed) coordinates.
//! Address problems are recorded in the center's `message`. Transport
//! failures leave the center untouched so a later run can retry it.

use std::sync::Arc;

use cwa_map_core::region::translate_region;
use cwa_map_db::models::center::{Center, SaveCenter};
use cwa_map_db::repositories::CenterRepo;
use cwa_map_db::DbPool;
use uuid::Uuid;

use crate::{GeocodeError, GeocodeResult, Geocoder};

/// Fold a lookup outcome into a save input. Returns `false` when nothing
/// should be persisted.
pub fn apply_geocode_result(
    center: &mut SaveCenter,
    outcome: &Result<GeocodeResult, GeocodeError>,
) -> bool {
    match outcome {
        Ok(result) => {
            center.zip = result.zip.clone();
            center.region = result
                .region
                .as_deref()
                .map(|r| translate_region(r).to_string());
            if !center.coordinates_fixed {
                center.longitude = result.location.longitude;
                center.latitude = result.location.latitude;
            }
            center.message = None;
            true
        }
        Err(e) if e.is_address_problem() => {
            center.message = Some(format!("Geocoding: {e}"));
            true
        }
        Err(_) => false,
    }
}

/// Summary of a background run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub updated: usize,
    pub skipped: usize,
    pub missing: usize,
}

#[derive(Clone)]
pub struct GeocodingWorker {
    pool: DbPool,
    geocoder: Arc<dyn Geocoder>,
}

impl GeocodingWorker {
    pub fn new(pool: DbPool, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { pool, geocoder }
    }

    /// Geocode one center and persist the result.
    ///
    /// Returns the updated center, or `None` if nothing was written: the
    /// lookup failed in transport or the center was deleted meanwhile.
    pub async fn geocode_center(&self, center: &Center) -> Result<Option<Center>, sqlx::Error> {
        tracing::info!(center = %center.uuid, address = %center.address, "Geocoding center");

        let outcome = self.geocoder.lookup(&center.address).await;
        if let Err(e) = &outcome {
            tracing::error!(center = %center.uuid, address = %center.address, error = %e, "Error geocoding center");
        }

        let mut input = SaveCenter::from(center);
        if !apply_geocode_result(&mut input, &outcome) {
            return Ok(None);
        }

        let updated = CenterRepo::update_geocoding(&self.pool, &input).await?;
        if updated.is_none() {
            tracing::warn!(center = %center.uuid, "Center deleted during geocoding");
        }
        Ok(updated)
    }

    /// Geocode centers one after another, re-reading each by UUID first.
    ///
    /// Centers deleted in the meantime are skipped. Failures are logged per
    /// center and never abort the run.
    pub async fn run_batch(&self, uuids: Vec<Uuid>) -> BatchOutcome {
        tracing::info!(count = uuids.len(), "Starting geocoding of centers");
        let mut outcome = BatchOutcome::default();

        for uuid in uuids {
            let center = match CenterRepo::find_by_uuid(&self.pool, uuid).await {
                Ok(Some(center)) => center,
                Ok(None) => {
                    tracing::warn!(center = %uuid, "Center not found, maybe already deleted");
                    outcome.missing += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(center = %uuid, error = %e, "Failed to load center for geocoding");
                    outcome.missing += 1;
                    continue;
                }
            };

            match self.geocode_center(&center).await {
                Ok(Some(_)) => outcome.updated += 1,
                Ok(None) => outcome.skipped += 1,
                Err(e) => {
                    tracing::error!(center = %uuid, error = %e, "Error saving geocoded center");
                    outcome.skipped += 1;
                }
            }
        }

        tracing::info!(
            updated = outcome.updated,
            skipped = outcome.skipped,
            missing = outcome.missing,
            "Geocoding of centers completed"
        );
        outcome
    }
}
