//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{InsenError, Result};
use crate::insen::protocol::INSEN_MAX_CONTROLLERS;
use crate::serial::{INSEN_BAUD_RATE, INSEN_READ_TIMEOUT};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause between opening the port and the first INFO request
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Monitoring configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default)]
    pub controller_id: u8,

    #[serde(default = "default_rate_hz")]
    pub rate_hz: u32,

    #[serde(default = "default_duration_s")]
    pub duration_s: u64,

    /// Stick deflection above which a state is reported
    #[serde(default = "default_significant_threshold")]
    pub significant_threshold: u16,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; empty logs to stdout
    #[serde(default)]
    pub file: String,
}

// Default value functions
#[cfg(windows)]
fn default_serial_port() -> String { "COM3".to_string() }
#[cfg(not(windows))]
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { INSEN_BAUD_RATE }
fn default_timeout_ms() -> u64 { INSEN_READ_TIMEOUT.as_millis() as u64 }
fn default_settle_ms() -> u64 { 100 }

fn default_rate_hz() -> u32 { 60 }
fn default_duration_s() -> u64 { 30 }
fn default_significant_threshold() -> u16 { 5000 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            controller_id: 0,
            rate_hz: default_rate_hz(),
            duration_s: default_duration_s(),
            significant_threshold: default_significant_threshold(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use insen_client::config::Config;
    ///
    /// let config = Config::load("config/insen.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.settle_ms > 5000 {
            return Err(invalid("settle_ms must be at most 5000"));
        }

        if self.monitor.controller_id >= INSEN_MAX_CONTROLLERS {
            return Err(invalid(format!(
                "controller_id must be between 0 and {}",
                INSEN_MAX_CONTROLLERS - 1
            )));
        }

        if self.monitor.rate_hz == 0 || self.monitor.rate_hz > 1000 {
            return Err(invalid("rate_hz must be between 1 and 1000"));
        }

        if self.monitor.duration_s == 0 {
            return Err(invalid("duration_s must be greater than 0"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> InsenError {
    InsenError::Config(toml::de::Error::custom(msg))
}
