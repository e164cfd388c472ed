//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML files (`mediator.toml`, `config.toml`)
//! - `yaml-config`: enables YAML files (`mediator.yaml`, `mediator.yml`, `config.yaml`, `config.yml`)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic base values ([`ConfigLoader::merge`])
//! 3. Main config file (the first of the candidate names found on the search paths)
//! 4. Profile-specific file next to it (`mediator.{profile}.toml`)
//! 5. Environment variables (`MEDIATOR_*`)
//! 6. Programmatic key overrides ([`ConfigLoader::set`])
//!
//! # Environment Variable Mapping
//!
//! Variables use the `MEDIATOR_` prefix with `__` as the nesting separator:
//!
//! - `MEDIATOR_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `MEDIATOR_REGISTRY__DUPLICATE_POLICY=replace` → `registry.duplicate_policy = "replace"`
//! - `MEDIATOR_REGISTRY__SCAN=[billing,users]` → `registry.scan = ["billing", "users"]`
//!
//! `MEDIATOR_PROFILE` selects the profile and is not part of the schema.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediator_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .set("logging.level", "debug")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::MediatorConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "MEDIATOR_";
const PROFILE_VAR: &str = "MEDIATOR_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `MEDIATOR_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic values layered just above the defaults.
    base: Figment,
    /// Programmatic values layered above everything else.
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            base: Figment::new(),
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Uses `config` in place of the built-in defaults.
    ///
    /// Files and environment variables still override it.
    pub fn merge(mut self, config: MediatorConfig) -> Self {
        self.base = self.base.merge(Serialized::defaults(config));
        self
    }

    /// Forces a single key, e.g. `set("logging.level", "debug")`.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<MediatorConfig> {
        let profile = self.profile.clone();
        let config: MediatorConfig = self.build_figment()?.extract()?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            duplicate_policy = ?config.registry.duplicate_policy,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(MediatorConfig::default()))
            .merge(std::mem::take(&mut self.base));

        match &self.config_file {
            Some(path) if path.exists() => {
                figment = self.merge_with_profile(figment, path)?;
            }
            Some(path) => return Err(ConfigError::FileNotFound(path.clone())),
            None => match self.find_config_file() {
                Some(path) => figment = self.merge_with_profile(figment, &path)?,
                None => warn!("No configuration file found, using defaults"),
            },
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment.merge(std::mem::take(&mut self.overrides)))
    }

    /// Merges `path` and, if present, its profile-specific sibling.
    fn merge_with_profile(&self, figment: Figment, path: &Path) -> ConfigResult<Figment> {
        info!(path = %path.display(), "Loading configuration file");
        let mut figment = Self::merge_config_file(figment, path)?;

        if let Some(profile_path) = self.profile_variant(path).filter(|p| p.exists()) {
            debug!(path = %profile_path.display(), "Loading profile-specific config");
            figment = Self::merge_config_file(figment, &profile_path)?;
        }
        Ok(figment)
    }

    /// `dir/mediator.toml` → `dir/mediator.{profile}.toml`.
    fn profile_variant(&self, path: &Path) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        Some(path.with_file_name(format!("{stem}.{}.{ext}", self.profile.as_str())))
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    ///
    /// Only extensions enabled via feature flags are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
        }
    }

    /// Directories searched for config files: the added ones, or else the
    /// current directory followed by the user config directory.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mediator"));
        }
        paths
    }

    /// File names tried in each search path, per enabled format.
    fn candidate_names() -> Vec<&'static str> {
        #[allow(unused_mut)]
        let mut names = Vec::new();
        #[cfg(feature = "toml-config")]
        names.extend(["mediator.toml", "config.toml"]);
        #[cfg(feature = "yaml-config")]
        names.extend(["mediator.yaml", "mediator.yml", "config.yaml", "config.yml"]);
        names
    }

    /// First existing candidate across the search paths.
    fn find_config_file(&self) -> Option<PathBuf> {
        let names = Self::candidate_names();
        self.search_paths()
            .into_iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists())
    }
}

// =============================================================================
// Tests
// =============================================================================
