//! Infrastructure Layer
//!
//! Contains implementations of external interfaces (database, auth, config, etc.)
//! This layer depends on the domain layer but not on the application layer.

pub mod auth;
pub mod config;
pub mod database;
pub mod logging;
pub mod shutdown;

// Re-export database types
pub use database::{DatabaseError, EbdDatabase, Result, Store};

// Re-export config types
pub use config::{ApiConfig, AuthConfig, ConfigError, DatabaseConfig, ServerConfig};

// Re-export infrastructure services
pub use auth::{Claims, PasswordHasher, TokenError, TokenIssuer};
pub use logging::{init_tracing, init_tracing_with_level};
pub use shutdown::ShutdownManager;
