//! Composition root.
//!
//! [`MediatorHost`] wires configuration, logging, services and handler
//! registration into a ready-to-use [`ServiceProvider`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mediator_runtime::MediatorHost;
//!
//! // Loads mediator.toml from the current directory, if any
//! let host = MediatorHost::builder()
//!     .configure_services(|services| {
//!         services.add_singleton(UserRepository::default());
//!     })
//!     .scan("create_user")
//!     .build()?;
//!
//! let message = host.mediator().send(CreateUser { name: "Mars".into() }).await?;
//! ```

use std::path::Path;

use mediator_core::{
    HandlerDescriptor, Mediator, RegistrationReport, ScanTarget, ServiceCollection,
    ServiceProvider,
};
use tracing::{debug, info};

use crate::config::{ConfigLoader, MediatorConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// A built container with every handler registered.
#[derive(Debug, Clone)]
pub struct MediatorHost {
    config: MediatorConfig,
    provider: ServiceProvider,
    report: RegistrationReport,
}

impl MediatorHost {
    /// Creates a host builder.
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// A mediator dispatching through this host's provider.
    pub fn mediator(&self) -> Mediator {
        self.provider.mediator()
    }

    /// The service provider.
    pub fn provider(&self) -> &ServiceProvider {
        &self.provider
    }

    /// The configuration the host was built with.
    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Totals of all registration passes run during `build`.
    pub fn report(&self) -> RegistrationReport {
        self.report
    }
}

type Configure = Box<dyn FnOnce(&mut ServiceCollection)>;

// =============================================================================
// HostBuilder
// =============================================================================

/// Builder for a [`MediatorHost`].
///
/// Scan targets come from `registry.scan` in the configuration plus any added
/// with [`scan`](Self::scan). If neither names a target and no explicit
/// handler was added, every linked handler is registered.
pub struct HostBuilder {
    loader: ConfigLoader,
    config: Option<MediatorConfig>,
    init_logging: bool,
    configure: Vec<Configure>,
    targets: Vec<ScanTarget>,
    handlers: Vec<HandlerDescriptor>,
}

impl HostBuilder {
    /// Creates a builder that looks for configuration in the current
    /// directory and then the user config directory.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
            config: None,
            init_logging: true,
            configure: Vec::new(),
            targets: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Uses `config` as is instead of loading one.
    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    ///
    /// Once any path is added the default locations are no longer searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Whether to install the global subscriber from `logging` (default: true).
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Registers services before handlers are bound.
    pub fn configure_services<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ServiceCollection) + 'static,
    {
        self.configure.push(Box::new(configure));
        self
    }

    /// Adds a scan target, e.g. `"create_user"` or `"*"`.
    pub fn scan(mut self, target: impl Into<ScanTarget>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Registers one handler explicitly.
    pub fn handler(mut self, descriptor: HandlerDescriptor) -> Self {
        self.handlers.push(descriptor);
        self
    }

    /// Builds the host.
    pub fn build(self) -> RuntimeResult<MediatorHost> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging)?;
        }

        let mut services = ServiceCollection::with_registry(config.registry.to_registry());
        for configure in self.configure {
            configure(&mut services);
        }

        let mut targets = config.registry.scan_targets();
        targets.extend(self.targets);
        if targets.is_empty() && self.handlers.is_empty() {
            debug!("No scan targets configured, scanning all linked handlers");
            targets.push(ScanTarget::All);
        }

        let mut report = services.add_mediator(&targets)?;
        if !self.handlers.is_empty() {
            report = report + services.add_handlers(&self.handlers)?;
        }

        let provider = services.build();
        info!(
            %report,
            handlers = provider.handler_count(),
            duplicate_policy = ?config.registry.duplicate_policy,
            lifetime = %config.registry.lifetime,
            "Mediator host ready"
        );

        Ok(MediatorHost {
            config,
            provider,
            report,
        })
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}
