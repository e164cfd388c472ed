//! Errors raised while loading or validating a [`MediatorConfig`](super::MediatorConfig).

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file passed to [`ConfigLoader::file`](super::ConfigLoader::file) does not exist.
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// No enabled format feature reads files with this extension.
    #[error("no enabled config format reads .{0} files")]
    UnsupportedFormat(String),

    /// The merged sources do not fit the schema.
    #[error("cannot extract configuration: {0}")]
    Extract(Box<figment::Error>),

    /// A `registry.scan` entry that is neither `*` nor a module path.
    #[error("registry.scan entry {0:?} is not a module path")]
    InvalidScanTarget(String),

    /// `logging.output = "file"` without `logging.file_path`.
    #[error("logging.output is \"file\" but logging.file_path is not set")]
    MissingLogFile,

    /// `logging.file_path` does not end in a file name.
    #[error("logging.file_path {} does not name a file", .0.display())]
    InvalidLogFile(PathBuf),

    /// A `logging.filters` key that is not a module path.
    #[error("logging.filters key {0:?} is not a module path")]
    InvalidLogFilter(String),
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Extract(Box::new(error))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
