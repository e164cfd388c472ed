//! Mediator Runtime - composition layer for the Mediator framework.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `MediatorConfig`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - A composition root that registers handlers and builds the container
//!   (`MediatorHost`)
//!
//! ```ignore
//! use mediator_runtime::MediatorHost;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let host = MediatorHost::builder()
//!         .configure_services(|services| {
//!             services.add_singleton(UserRepository::default());
//!         })
//!         .build()?;
//!
//!     let message = host.mediator().send(CreateUser { name: "Mars".into() }).await?;
//!     println!("{message}");
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! `mediator.toml` in the working directory, or else in the user config
//! directory (`~/.config/mediator` on Linux), is picked up automatically; see
//! [`config::loader`] for the full layering.
//!
//! ```toml
//! [registry]
//! duplicate_policy = "reject"   # or "replace"
//! lifetime = "transient"        # or "singleton"
//! scan = ["create_user"]        # empty means every linked handler
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, MediatorConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{HostBuilder, MediatorHost};
pub use logging::{LoggingBuilder, LoggingError, init_from_config};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
