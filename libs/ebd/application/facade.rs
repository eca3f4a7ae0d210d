//! Application Facade
//!
//! Public API for binaries (presentation layer).
//! Bundles every use case behind one shared store.

use super::{AttendanceService, AuthService, ClassService, ReportService, StudentService};
use crate::infrastructure::{
    init_tracing, init_tracing_with_level, ApiConfig, EbdDatabase, PasswordHasher, Store,
    TokenIssuer,
};
use std::sync::Arc;
use std::time::Duration;

/// Application facade for the EBD web service
pub struct EbdApp {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub classes: ClassService,
    pub students: StudentService,
    pub attendance: AttendanceService,
    pub reports: ReportService,
}

impl EbdApp {
    /// Connect to Postgres and build every service
    pub async fn connect(config: &ApiConfig) -> anyhow::Result<Self> {
        let database = EbdDatabase::connect(&config.database).await?;
        Ok(Self::with_store(Arc::new(database), config))
    }

    /// Build services over an existing store
    pub fn with_store(store: Arc<dyn Store>, config: &ApiConfig) -> Self {
        let hasher = PasswordHasher::new(config.auth.password_iterations);
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            Duration::from_secs(config.auth.token_ttl_secs),
        );

        Self {
            auth: AuthService::new(Arc::clone(&store), hasher, tokens),
            classes: ClassService::new(Arc::clone(&store)),
            students: StudentService::new(Arc::clone(&store)),
            attendance: AttendanceService::new(Arc::clone(&store)),
            reports: ReportService::new(Arc::clone(&store)),
            store,
        }
    }
}

/// Initialize tracing for binaries with default (info) level
pub fn init_logging() {
    init_tracing();
}

/// Initialize tracing for binaries with a specific log level
pub fn init_logging_with_level(level: &str) {
    init_tracing_with_level(level);
}
