#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use cwa_map_core::center::{Bounds, Coordinates};
use cwa_map_geocoding::{GeocodeError, GeocodeResult, Geocoder, GoogleGeocoderConfig};
use cwa_map_notify::{NotifierConfig, PgReportStore};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use cwa_map_api::auth::jwks::{JwtConfig, TokenVerifier};
use cwa_map_api::config::{SearchConfig, ServerConfig};
use cwa_map_api::metrics::SearchMetrics;
use cwa_map_api::routes;
use cwa_map_api::state::AppState;

/// HS256 secret the test verifier accepts.
const TEST_SECRET: &[u8] = b"api-integration-test-secret";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:4200".to_string()],
        request_timeout_secs: 30,
        database_max_connections: 5,
        jwt: JwtConfig {
            jwks_url: "http://localhost/jwks".to_string(),
            key_id: "test".to_string(),
            algorithm: Algorithm::HS256,
        },
        geocoding: GoogleGeocoderConfig {
            api_key: "unused".to_string(),
            country: "de".to_string(),
        },
        search: SearchConfig::default(),
        reports_interval_minutes: 1440,
        notifier: NotifierConfig {
            interval: Duration::from_secs(86_400),
            age_weeks: 4,
            renotify_weeks: 2,
        },
    }
}

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Answers every lookup with the same result, or `NoResult` when empty.
pub struct StaticGeocoder(pub Option<GeocodeResult>);

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn lookup(&self, _address: &str) -> Result<GeocodeResult, GeocodeError> {
        self.0.clone().ok_or(GeocodeError::NoResult)
    }
}

pub fn berlin() -> GeocodeResult {
    GeocodeResult {
        formatted_address: "Invalidenstraße 1, 10115 Berlin, Germany".to_string(),
        bounds: Bounds {
            ne: Coordinates { longitude: 13.39, latitude: 52.54 },
            sw: Coordinates { longitude: 13.37, latitude: 52.52 },
        },
        location: Coordinates { longitude: 13.38, latitude: 52.53 },
        region: Some("Berlin".to_string()),
        zip: Some("10115".to_string()),
    }
}

/// A signed access token for `subject` carrying `roles`.
pub fn token(subject: &str, roles: &[&str]) -> String {
    let claims = serde_json::json!({
        "sub": subject,
        "name": format!("Operator {subject}"),
        "preferred_username": format!("nr-{subject}"),
        "email": format!("{subject}@operator.example"),
        "realm_access": { "roles": roles },
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub fn test_state(pool: PgPool, geocoder: StaticGeocoder) -> AppState {
    AppState {
        config: Arc::new(test_config()),
        verifier: Arc::new(TokenVerifier::new(
            DecodingKey::from_secret(TEST_SECRET),
            Algorithm::HS256,
        )),
        geocoder: Arc::new(geocoder),
        reports: Arc::new(PgReportStore::new(pool.clone())),
        metrics: Arc::new(SearchMetrics::default()),
        pool,
    }
}

/// Full router with a geocoder that always resolves to Berlin.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app(test_state(pool, StaticGeocoder(Some(berlin()))))
}

/// Mirrors the router construction in `main.rs`.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:4200".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(t) => builder.header(AUTHORIZATION, format!("Bearer {t}")),
        None => builder,
    }
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, request(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::GET, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let req = request(Method::POST, uri, None)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

pub async fn post_json_auth(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    let req = request(Method::POST, uri, Some(token))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

pub async fn post_bytes_auth(app: Router, uri: &str, token: &str, body: Vec<u8>) -> Response {
    let req = request(Method::POST, uri, Some(token))
        .header(CONTENT_TYPE, "text/csv")
        .body(Body::from(body))
        .unwrap();
    send(app, req).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::POST, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn post(app: Router, uri: &str) -> Response {
    send(app, request(Method::POST, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn put_json_auth(app: Router, uri: &str, token: &str, body: serde_json::Value) -> Response {
    let req = request(Method::PUT, uri, Some(token))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, request(Method::DELETE, uri, Some(token)).body(Body::empty()).unwrap()).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
