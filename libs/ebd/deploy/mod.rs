//! Deployment Layer
//!
//! Model and checks for the compose file that runs the database and the
//! API container together.

pub mod compose;

pub use compose::{
    interpolations, Build, ComposeError, ComposeFile, ComposeIssue, DependsOn, Environment,
    Interpolation, PortBinding, PortEntry, PortRange, Service, VolumeEntry, VolumeMount,
};
