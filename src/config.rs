//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::protocol::hobbywing::HOBBYWING_BAUD;
use crate::protocol::kiss::KISS_BAUD;
use crate::telemetry::MAX_MOTORS;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub esc: EscConfig,
    pub monitor: MonitorConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// Telemetry pads on most ESCs share a single wire
    #[serde(default)]
    pub half_duplex: bool,
}

/// ESC telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EscConfig {
    #[serde(default = "default_protocol")]
    pub protocol: EscProtocol,

    #[serde(default = "default_motor_count")]
    pub motor_count: usize,

    #[serde(default = "default_motor_pole_count")]
    pub motor_pole_count: u8,
}

/// Snapshot monitor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
}

/// Wire protocol spoken by the connected ESCs
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EscProtocol {
    /// Telemetry acquisition disabled
    None,
    /// KISS request/response telemetry
    Kiss,
    /// Hobbywing V4 continuous stream
    Hobbywing,
}

impl EscProtocol {
    /// Serial baud rate fixed by the ESC firmware, `None` when disabled.
    #[must_use]
    pub fn baud(self) -> Option<u32> {
        match self {
            EscProtocol::None => None,
            EscProtocol::Kiss => Some(KISS_BAUD),
            EscProtocol::Hobbywing => Some(HOBBYWING_BAUD),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }

fn default_protocol() -> EscProtocol { EscProtocol::Kiss }
fn default_motor_count() -> usize { 4 }
fn default_motor_pole_count() -> u8 { 14 }

fn default_snapshot_interval_ms() -> u64 { 1000 }

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
    /// use esc_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
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
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate serial port configuration
        if self.serial.port.is_empty() {
            return Err(crate::error::EscTelemetryError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        // Validate motor configuration
        if self.esc.motor_count == 0 || self.esc.motor_count > MAX_MOTORS {
            return Err(crate::error::EscTelemetryError::Config(
                toml::de::Error::custom(format!(
                    "motor_count must be between 1 and {}", MAX_MOTORS
                ))
            ));
        }

        if self.esc.motor_pole_count < 2 || self.esc.motor_pole_count % 2 != 0 {
            return Err(crate::error::EscTelemetryError::Config(
                toml::de::Error::custom("motor_pole_count must be an even number of at least 2")
            ));
        }

        // Validate monitor timing
        if self.monitor.snapshot_interval_ms == 0 || self.monitor.snapshot_interval_ms > 60000 {
            return Err(crate::error::EscTelemetryError::Config(
                toml::de::Error::custom("snapshot_interval_ms must be between 1 and 60000")
            ));
        }

        Ok(())
    }
}
