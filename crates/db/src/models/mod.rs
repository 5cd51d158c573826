//! Row models and input DTOs, one module per table.

pub mod bug_report;
pub mod center;
pub mod operator;
