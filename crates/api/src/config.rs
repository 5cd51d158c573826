use std::str::FromStr;
use std::time::Duration;

use cwa_map_core::sampler::{DEFAULT_FRESHNESS_WEEKS, DEFAULT_RESULT_LIMIT};
use cwa_map_geocoding::GoogleGeocoderConfig;
use cwa_map_notify::NotifierConfig;

use crate::auth::jwks::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Everything except the identity provider and geocoder credentials has a
/// default suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `9090`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Connection pool size (default: `20`).
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub geocoding: GoogleGeocoderConfig,
    pub search: SearchConfig,
    /// Minutes between two report publish cycles (default: `1440`).
    pub reports_interval_minutes: u64,
    pub notifier: NotifierConfig,
}

/// Parameters of the public viewport search.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Target number of centers per response.
    pub result_limit: i64,
    /// Centers not updated within this many weeks are hidden.
    pub freshness_weeks: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            result_limit: DEFAULT_RESULT_LIMIT,
            freshness_weeks: DEFAULT_FRESHNESS_WEEKS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                                | Default                  |
    /// |----------------------------------------|--------------------------|
    /// | `HOST`                                 | `0.0.0.0`                |
    /// | `PORT`                                 | `9090`                   |
    /// | `CORS_ORIGINS`                         | `http://localhost:4200`  |
    /// | `REQUEST_TIMEOUT_SECS`                 | `30`                     |
    /// | `DATABASE_MAX_CONNECTIONS`             | `20`                     |
    /// | `GOOGLE_MAPS_API_KEY`                  | **required**             |
    /// | `GEOCODING_COUNTRY`                    | `de`                     |
    /// | `SEARCH_RESULT_LIMIT`                  | `200`                    |
    /// | `CENTER_FRESHNESS_WEEKS`               | `4`                      |
    /// | `REPORTS_INTERVAL_MINUTES`             | `1440`                   |
    /// | `OPERATOR_NOTIFICATION_INTERVAL_HOURS` | `24`                     |
    /// | `OPERATOR_NOTIFICATION_AGE_WEEKS`      | `4`                      |
    /// | `OPERATOR_RENOTIFY_WEEKS`              | `2`                      |
    ///
    /// JWT settings are documented on [`JwtConfig::from_env`]. SMTP settings
    /// are read separately by `cwa_map_notify::MailConfig::from_env`.
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a value does not parse.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 9090);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:4200".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);
        let database_max_connections: u32 = env_or("DATABASE_MAX_CONNECTIONS", 20);

        let geocoding = GoogleGeocoderConfig {
            api_key: std::env::var("GOOGLE_MAPS_API_KEY")
                .expect("GOOGLE_MAPS_API_KEY must be set in the environment"),
            country: std::env::var("GEOCODING_COUNTRY").unwrap_or_else(|_| "de".into()),
        };

        let search = SearchConfig {
            result_limit: env_or("SEARCH_RESULT_LIMIT", DEFAULT_RESULT_LIMIT),
            freshness_weeks: env_or("CENTER_FRESHNESS_WEEKS", DEFAULT_FRESHNESS_WEEKS),
        };

        let notification_hours: u64 = env_or("OPERATOR_NOTIFICATION_INTERVAL_HOURS", 24);
        let notifier = NotifierConfig {
            interval: Duration::from_secs(notification_hours * 3600),
            age_weeks: env_or("OPERATOR_NOTIFICATION_AGE_WEEKS", 4),
            renotify_weeks: env_or("OPERATOR_RENOTIFY_WEEKS", 2),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_max_connections,
            jwt: JwtConfig::from_env(),
            geocoding,
            search,
            reports_interval_minutes: env_or("REPORTS_INTERVAL_MINUTES", 1440),
            notifier,
        }
    }

    pub fn reports_interval(&self) -> Duration {
        Duration::from_secs(self.reports_interval_minutes * 60)
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number")),
        Err(_) => default,
    }
}
