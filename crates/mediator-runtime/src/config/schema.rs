//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use mediator_core::{DuplicatePolicy, HandlerRegistry, Lifetime, ScanTarget};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// ```toml
/// [registry]
/// duplicate_policy = "reject"
/// lifetime = "transient"
/// scan = ["create_user"]
///
/// [logging]
/// level = "debug"
/// format = "pretty"
///
/// [logging.filters]
/// "mediator_core::dispatcher" = "trace"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MediatorConfig {
    /// Handler registration settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Registry
// =============================================================================

/// Handler registration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// What to do when two handler types claim the same request.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Lifetime of handler instances.
    #[serde(default)]
    pub lifetime: Lifetime,

    /// Module paths to scan for handlers; `"*"` selects everything.
    #[serde(default)]
    pub scan: Vec<String>,
}

impl RegistryConfig {
    /// Scan targets named in `scan`.
    pub fn scan_targets(&self) -> Vec<ScanTarget> {
        self.scan
            .iter()
            .map(|path| ScanTarget::from(path.trim()))
            .collect()
    }

    /// Creates an empty registry with the configured policy and lifetime.
    pub fn to_registry(&self) -> HandlerRegistry {
        HandlerRegistry::new(self.duplicate_policy, self.lifetime)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Rotation schedule of the log file.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Span lifecycle events to emit.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `"mediator_core::registry" = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Minutely,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_targets() {
        let config = RegistryConfig {
            scan: vec!["*".to_string(), " create_user ".to_string()],
            ..Default::default()
        };

        assert_eq!(
            config.scan_targets(),
            vec![ScanTarget::All, ScanTarget::module("create_user")]
        );
    }

    #[test]
    fn test_to_registry_carries_settings() {
        let config = RegistryConfig {
            duplicate_policy: DuplicatePolicy::Replace,
            lifetime: Lifetime::Singleton,
            scan: Vec::new(),
        };

        let registry = config.to_registry();
        assert_eq!(registry.policy(), DuplicatePolicy::Replace);
        assert_eq!(registry.lifetime(), Lifetime::Singleton);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::default().as_str(), "info");
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }
}
