//! HTTP API for the test-center directory.
//!
//! - [`config`] -- Server configuration loaded from the environment.
//! - [`state`] -- Shared application state handed to every handler.
//! - [`error`] -- [`error::AppError`] and the JSON error envelope.
//! - [`auth`] -- Bearer token verification against the identity provider.
//! - [`middleware`] -- Authentication and role extractors.
//! - [`dto`] -- Request and response bodies.
//! - [`export`] -- CSV export of all centers.
//! - [`metrics`] -- In-process search counters.
//! - [`handlers`] -- Request handlers.
//! - [`routes`] -- Route tree.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod export;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
