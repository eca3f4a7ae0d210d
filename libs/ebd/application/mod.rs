//! Application Layer
//!
//! Contains use cases and application services.
//! This layer depends on domain and infrastructure layers.

pub mod attendance;
pub mod auth;
pub mod classes;
pub mod error;
pub mod facade;
pub mod reports;
pub mod students;

// Re-export application facade for binaries
pub use facade::{init_logging, init_logging_with_level, EbdApp};

// Re-export use cases
pub use attendance::AttendanceService;
pub use auth::AuthService;
pub use classes::ClassService;
pub use reports::{MonthlyQuery, ReportService, WeeklyQuery};
pub use students::StudentService;

pub use error::{ServiceError, ServiceResult};
