//! Domain Layer
//!
//! Contains pure business entities and domain models.
//! This layer has no dependencies on infrastructure or application layers.

pub mod history;
pub mod models;
pub mod payloads;

// Re-export domain models
pub use models::{
    parse_date, Attendance, Class, HistoryRecord, Student, StudentStatus, User, DATE_FORMAT,
};

// Re-export payloads and commands
pub use payloads::{
    AttendancePayload, AttendanceUpdate, ClassPayload, ClassUpdate, Credentials, NewAttendance,
    NewClass, NewStudent, StudentPayload, StudentUpdate, ValidationError,
};

pub use history::{find_entry, month_bounds, student_history};
