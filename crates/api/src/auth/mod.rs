//! Bearer token verification.
//!
//! Tokens are issued by an external identity provider; this service only
//! verifies them against the provider's published signing key.

pub mod jwks;
