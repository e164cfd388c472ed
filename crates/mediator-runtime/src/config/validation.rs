//! Checks that serde cannot express: module paths and the log file.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, MediatorConfig, RegistryConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &MediatorConfig) -> ConfigResult<()> {
    validate_registry_config(&config.registry)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates registry settings.
fn validate_registry_config(registry: &RegistryConfig) -> ConfigResult<()> {
    for entry in &registry.scan {
        let path = entry.trim();
        if path != "*" && !is_module_path(path) {
            return Err(ConfigError::InvalidScanTarget(entry.clone()));
        }
    }
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        match &logging.file_path {
            None => return Err(ConfigError::MissingLogFile),
            Some(path) if path.file_name().is_none() => {
                return Err(ConfigError::InvalidLogFile(path.clone()));
            }
            Some(_) => {}
        }
    }

    if let Some(module) = logging.filters.keys().find(|module| !is_module_path(module)) {
        return Err(ConfigError::InvalidLogFilter(module.clone()));
    }

    Ok(())
}

/// `crate` or `crate::module::...`, each segment a plain identifier.
fn is_module_path(path: &str) -> bool {
    !path.is_empty()
        && path.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = MediatorConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_scan_targets() {
        let mut config = MediatorConfig::default();
        config.registry.scan = vec!["*".into(), "create_user::handlers".into()];
        assert!(validate_config(&config).is_ok());

        for bad in ["", "create-user", "users::", "::users", "9lives"] {
            config.registry.scan = vec![bad.to_string()];
            assert!(
                matches!(validate_config(&config), Err(ConfigError::InvalidScanTarget(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = MediatorConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingLogFile)
        ));

        config.logging.file_path = Some(PathBuf::from("logs/.."));
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidLogFile(_))
        ));

        config.logging.file_path = Some(PathBuf::from("logs/mediator.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_filter_targets() {
        let mut config = MediatorConfig::default();
        config
            .logging
            .filters
            .insert("mediator_core::registry".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_ok());

        config.logging.filters.insert("not a module".into(), LogLevel::Debug);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidLogFilter(key)) if key == "not a module"
        ));
    }
}
