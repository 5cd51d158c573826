//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Methods
//! that may run inside [`use_transaction`](crate::use_transaction) accept any
//! executor (pool or `&mut PgConnection`); the rest take `&PgPool`.

pub mod bug_report_repo;
pub mod center_repo;
pub mod operator_repo;
pub mod system_setting_repo;

pub use bug_report_repo::BugReportRepo;
pub use center_repo::{CenterRepo, SaveCenterError};
pub use operator_repo::OperatorRepo;
pub use system_setting_repo::SystemSettingRepo;
