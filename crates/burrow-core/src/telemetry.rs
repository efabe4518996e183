//! Logging initialisation
//!
//! TigerStyle: Explicit telemetry configuration with bounded resource usage.
//!
//! Installs a `tracing` subscriber with an `EnvFilter`. Library code only
//! emits events; binaries and test harnesses decide whether to install a
//! subscriber.

use crate::error::{Error, Result};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,
    /// Log level filter, used when `RUST_LOG` is not set
    pub log_level: String,
    /// Whether to output events to stdout
    pub stdout_enabled: bool,
    /// Whether to include the event target in formatted output
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "burrow".to_string(),
            log_level: "info".to_string(),
            stdout_enabled: true,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Disable stdout output
    pub fn without_stdout(mut self) -> Self {
        self.stdout_enabled = false;
        self
    }

    /// Omit event targets from formatted output
    pub fn without_target(mut self) -> Self {
        self.with_target = false;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - `BURROW_SERVICE_NAME`: Service name (default: "burrow")
    /// - `RUST_LOG`: Log level filter (default: "info")
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("BURROW_SERVICE_NAME").unwrap_or_else(|_| "burrow".to_string());
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            service_name,
            log_level,
            ..Default::default()
        }
    }
}

/// Guard that logs telemetry shutdown when dropped
#[derive(Debug)]
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Telemetry shut down");
    }
}

/// Initialize the global tracing subscriber
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = if config.stdout_enabled {
        Some(tracing_subscriber::fmt::layer().with_target(config.with_target))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Internal {
            message: format!("failed to initialize tracing subscriber: {}", e),
        })?;

    tracing::info!(service = %config.service_name, "Telemetry initialized");

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "burrow");
        assert_eq!(config.log_level, "info");
        assert!(config.stdout_enabled);
    }

    #[test]
    fn test_init_returns_guard_once() {
        // The global subscriber can be installed once per process
        let guard = init_telemetry(TelemetryConfig::new("guard-test").without_stdout()).unwrap();
        assert_eq!(guard.service_name(), "guard-test");
        assert!(init_telemetry(TelemetryConfig::new("again")).is_err());
    }

    #[test]
    fn test_telemetry_config_builder() {
        let config = TelemetryConfig::new("hub-test")
            .with_log_level("debug")
            .without_stdout()
            .without_target();

        assert_eq!(config.service_name, "hub-test");
        assert_eq!(config.log_level, "debug");
        assert!(!config.stdout_enabled);
        assert!(!config.with_target);
    }
}
