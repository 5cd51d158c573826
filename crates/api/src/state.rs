use std::sync::Arc;

use cwa_map_geocoding::{Geocoder, GeocodingWorker};
use cwa_map_notify::ReportStore;

use crate::auth::jwks::TokenVerifier;
use crate::config::ServerConfig;
use crate::metrics::SearchMetrics;

/// Shared application state available to all handlers via Axum's `State` extractor.
///
/// Cheaply cloneable: every field is either a pool handle or an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: cwa_map_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub verifier: Arc<TokenVerifier>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Report queue used by the public report endpoint.
    pub reports: Arc<dyn ReportStore>,
    pub metrics: Arc<SearchMetrics>,
}

impl AppState {
    /// A geocoding worker sharing this state's pool and geocoder.
    pub fn geocoding_worker(&self) -> GeocodingWorker {
        GeocodingWorker::new(self.pool.clone(), Arc::clone(&self.geocoder))
    }
}
