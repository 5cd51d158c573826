//! Well-known role names carried in the token's `realm_access.roles` claim.

pub const ROLE_ADMIN: &str = "admin";

/// Operators allowed to advertise digital COVID certificates.
pub const ROLE_DCC: &str = "dcc";
