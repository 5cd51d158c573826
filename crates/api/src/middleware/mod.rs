//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the caller from a verified Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` realm role.

pub mod auth;
pub mod rbac;
