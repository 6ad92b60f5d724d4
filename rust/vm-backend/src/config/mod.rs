//! Configuration management for the VM backend.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `config/vm-backend.{toml,yaml,json}` (optional), then the file passed
//!    with `--config`
//! 3. Environment variables prefixed with `VM_BACKEND__`, using `__` as the
//!    section separator (e.g. `VM_BACKEND__LIFECYCLE__START_DELAY_MS=500`)
//!
//! Command-line flags are applied on top by the binary.

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manager::Delays;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Simulated transition delays.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Where the VM list is persisted.
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration without validation.
    ///
    /// The binary applies its flags to the result and then runs
    /// [`ConfigValidator::validate`].
    pub fn load_unchecked(config_file: Option<&Path>) -> anyhow::Result<Self> {
        // .env is optional
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .set_default("server.address", default_address())?
            .set_default("lifecycle.start_delay_ms", default_start_delay_ms())?
            .set_default("lifecycle.stop_delay_ms", default_stop_delay_ms())?
            .add_source(config::File::with_name("config/vm-backend").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("VM_BACKEND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, `host:port` or `:port`.
    #[serde(default = "default_address")]
    pub address: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// The address to bind, with a bare `:port` expanded to all interfaces.
    #[must_use]
    pub fn bind_address(&self) -> String {
        if self.address.starts_with(':') {
            format!("0.0.0.0{}", self.address)
        } else {
            self.address.clone()
        }
    }
}

fn default_address() -> String {
    ":8080".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Delays before a VM leaves `Starting` or `Stopping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    #[serde(default = "default_stop_delay_ms")]
    pub stop_delay_ms: u64,
}

impl LifecycleConfig {
    #[must_use]
    pub fn delays(&self) -> Delays {
        Delays {
            start: Duration::from_millis(self.start_delay_ms),
            stop: Duration::from_millis(self.stop_delay_ms),
        }
    }
}

#[allow(clippy::cast_possible_truncation, reason = "default delays are a few seconds")]
fn default_start_delay_ms() -> u64 {
    crate::manager::DEFAULT_START_DELAY.as_millis() as u64
}

#[allow(clippy::cast_possible_truncation, reason = "default delays are a few seconds")]
fn default_stop_delay_ms() -> u64 {
    crate::manager::DEFAULT_STOP_DELAY.as_millis() as u64
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            stop_delay_ms: default_stop_delay_ms(),
        }
    }
}

/// Persistence of the VM list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file the VM list is loaded from, created with the seed set when
    /// missing.
    #[serde(default = "default_vms_file")]
    pub vms_file: PathBuf,
}

fn default_vms_file() -> PathBuf {
    PathBuf::from("vms.json")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            vms_file: default_vms_file(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.lifecycle.delays(), Delays::default());
        assert_eq!(config.storage.vms_file, PathBuf::from("vms.json"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bind_address_keeps_explicit_host() {
        let server = ServerConfig {
            address: "127.0.0.1:3000".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(server.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    #[serial]
    fn test_load_without_sources_uses_defaults() {
        let config = AppConfig::load_unchecked(None).unwrap();
        assert!(ConfigValidator::validate(&config).is_ok());
        assert_eq!(config.lifecycle.start_delay_ms, 10_000);
        assert_eq!(config.lifecycle.stop_delay_ms, 5_000);
        assert_eq!(config.server.timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[lifecycle]\nstart_delay_ms = 250\n\n[storage]\nvms_file = \"/tmp/fleet.json\""
        )
        .unwrap();

        let config = AppConfig::load_unchecked(Some(file.path())).unwrap();
        assert_eq!(config.lifecycle.start_delay_ms, 250);
        assert_eq!(config.lifecycle.stop_delay_ms, 5_000);
        assert_eq!(config.storage.vms_file, PathBuf::from("/tmp/fleet.json"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("VM_BACKEND__LIFECYCLE__STOP_DELAY_MS", "42");
        }
        let config = AppConfig::load_unchecked(None);
        // SAFETY: as above.
        unsafe {
            std::env::remove_var("VM_BACKEND__LIFECYCLE__STOP_DELAY_MS");
        }

        assert_eq!(config.unwrap().lifecycle.stop_delay_ms, 42);
    }

    #[test]
    #[serial]
    fn test_missing_config_file_is_an_error() {
        let result = AppConfig::load_unchecked(Some(Path::new("/nonexistent/vm-backend.toml")));
        assert!(result.is_err());
    }
}
