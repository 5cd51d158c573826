//! Domain layer for the test-center directory.
//!
//! Zero internal dependencies: everything here is pure logic shared by the
//! repository, geocoding, notification and HTTP crates.

pub mod bug_report;
pub mod center;
pub mod csv_import;
pub mod error;
pub mod region;
pub mod roles;
pub mod sampler;
pub mod search;
pub mod settings;
pub mod types;
