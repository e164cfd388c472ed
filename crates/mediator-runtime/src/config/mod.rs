//! Configuration module for the Mediator runtime.
//!
//! This module provides figment-based loading and validation for the handler
//! registry and logging settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, MediatorConfig, RegistryConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
