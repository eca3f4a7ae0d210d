//! EBD Management API - Main Library
//!
//! Root package of the workspace: binaries and the helpers they share.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **ebd**: Core business logic, HTTP layer and deployment checks (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use ebd_server::bin_common::{load_config_from_env, ConfigType};
//! use ebd_server::ebd::application::EbdApp;
//! ```

// Re-export workspace libraries for convenience
pub use ebd;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables
    //!
    //! Provides shared functionality for the presentation layer (binaries)
    //! following Clean Architecture principles.

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
