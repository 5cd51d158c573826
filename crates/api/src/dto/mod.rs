//! Request and response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire; dates are `dd.mm.yyyy` strings.

pub mod center;
pub mod operator;
