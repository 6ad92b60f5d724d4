//! Startup validation of [`AppConfig`].

use std::net::SocketAddr;

use super::error::{ConfigResult, ConfigurationError};
use super::{AppConfig, ServerConfig, StorageConfig};

/// Checks configuration values before the server starts.
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire application configuration, reporting every issue.
    pub fn validate(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&config.server) {
            match e {
                ConfigurationError::Multiple(errs) => errors.extend(errs),
                e => errors.push(e),
            }
        }
        if let Err(e) = Self::validate_storage(&config.storage) {
            errors.push(e);
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the listen address and request timeout.
    pub fn validate_server(config: &ServerConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if config.bind_address().parse::<SocketAddr>().is_err() {
            errors.push(ConfigurationError::invalid(
                format!("server.address {:?} is not a socket address", config.address),
                "Use --address with ip:port or :port, for example 127.0.0.1:8080 or :8080",
            ));
        }

        if config.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "server.timeout_secs must be greater than zero",
                "Set VM_BACKEND__SERVER__TIMEOUT_SECS to a positive number of seconds",
            ));
        }

        ConfigurationError::collect(errors)
    }

    /// Validate where the VM list is persisted.
    pub fn validate_storage(config: &StorageConfig) -> ConfigResult<()> {
        if config.vms_file.as_os_str().is_empty() {
            return Err(ConfigurationError::invalid(
                "storage.vms_file is empty",
                "Use --vms-file to point at the JSON file holding the VM list",
            ));
        }
        Ok(())
    }
}
