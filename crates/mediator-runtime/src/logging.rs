//! Logging setup built on `tracing-subscriber`.
//!
//! Every dispatch runs inside a `dispatch` span carrying the request and
//! response type names. Enabling `logging.span_events.new` and `close` gives
//! one line when a request enters the mediator and one, with timings, when
//! its handler returns:
//!
//! ```toml
//! [logging]
//! level = "info"
//! span_events = { new = true, close = true }
//!
//! [logging.filters]
//! "mediator_core::dispatcher" = "debug"
//! ```
//!
//! [`init_from_config`] is what [`MediatorHost`](crate::MediatorHost) calls;
//! [`LoggingBuilder`] is there for programs that want to handle the errors
//! themselves.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

/// Why the global subscriber could not be installed.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// File output was requested without a file path.
    #[error("file output requested without a log file path")]
    MissingFilePath,

    /// The log file or its directory could not be created.
    #[error("cannot open log file: {0}")]
    FileAppender(#[from] InitError),

    /// A per-module filter did not parse as a directive.
    #[error("invalid log filter {directive:?}: {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: ParseError,
    },

    /// Another global subscriber is already installed.
    #[error(transparent)]
    AlreadyInstalled(#[from] TryInitError),
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |span, (_, flag)| span | flag)
}

/// Opens `path` as a rolling log file, creating its directory if needed.
///
/// Rotated files are named `<file name>.<date>`; with `never` the file name is
/// used as is.
fn open_log_file(path: &Path, rotation: LogRotation) -> Result<RollingFileAppender, LoggingError> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .ok_or(LoggingError::MissingFilePath)?
        .to_string_lossy()
        .into_owned();

    Ok(RollingFileAppender::builder()
        .rotation(rotation.into())
        .filename_prefix(prefix)
        .build(directory)?)
}

/// Installs the global subscriber described by `config`.
///
/// An already installed subscriber is kept and is not an error, so hosts can
/// be built more than once per process. File and filter problems are.
pub fn init_from_config(config: &LoggingConfig) -> Result<(), LoggingError> {
    match LoggingBuilder::from_config(config).try_init() {
        Err(LoggingError::AlreadyInstalled(_)) => {
            debug!("Global subscriber already installed, keeping it");
            Ok(())
        }
        result => result,
    }
}

// =============================================================================
// LoggingBuilder
// =============================================================================

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Subscriber settings resolved from a [`LoggingConfig`].
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: LogLevel,
    filters: Vec<(String, LogLevel)>,
    span_events: FmtSpan,
    format: LogFormat,
    output: LogOutput,
    file: Option<(PathBuf, LogRotation)>,
    thread_ids: bool,
    file_location: bool,
}

impl LoggingBuilder {
    /// Resolves `config`. Filters are ordered by module so the resulting
    /// directive list is stable.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<(String, LogLevel)> = config
            .filters
            .iter()
            .map(|(module, level)| (module.clone(), *level))
            .collect();
        filters.sort_by(|(a, _), (b, _)| a.cmp(b));

        Self {
            level: config.level,
            filters,
            span_events: fmt_span(&config.span_events),
            format: config.format,
            output: config.output,
            file: config
                .file_path
                .clone()
                .map(|path| (path, config.rotation)),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
        }
    }

    /// `RUST_LOG` when set, otherwise the configured level, plus one
    /// directive per module filter.
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));

        for (module, level) in &self.filters {
            let directive = format!("{module}={level}");
            let parsed: Directive = directive
                .parse()
                .map_err(|source| LoggingError::InvalidFilter { directive, source })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    fn writer(&self) -> Result<BoxMakeWriter, LoggingError> {
        Ok(match self.output {
            LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
            LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogOutput::File => {
                let (path, rotation) = self.file.as_ref().ok_or(LoggingError::MissingFilePath)?;
                BoxMakeWriter::new(open_log_file(path, *rotation)?)
            }
        })
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.output != LogOutput::File)
            .with_span_events(self.span_events.clone())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => {
                eprintln!("JSON logging requires the `json-log` feature, using full format");
                layer.boxed()
            }
        }
    }

    /// Installs the global subscriber.
    ///
    /// Filters and the log file are checked before anything is installed.
    pub fn try_init(self) -> Result<(), LoggingError> {
        let filter = self.env_filter()?;
        let layer = self.fmt_layer(self.writer()?);

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()?;
        Ok(())
    }
}
