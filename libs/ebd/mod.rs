//! EBD Management API
//!
//! Sunday-school (Escola Bíblica Dominical) records: classes, students,
//! weekly attendance and reports over a Postgres store.

pub mod application;
pub mod deploy;
pub mod domain;
pub mod http;
pub mod infrastructure;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use application::{EbdApp, ServiceError, ServiceResult};
pub use deploy::{ComposeFile, ComposeIssue};
pub use domain::{Attendance, Class, Student, StudentStatus, User};
pub use http::router;
pub use infrastructure::{init_tracing, ApiConfig, EbdDatabase, ShutdownManager, Store};
