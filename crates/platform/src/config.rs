//! Driver configuration and constants
//!
//! Pin map, bus settings and the version strings reported by the driver.
//! The defaults match the Waveshare e-Paper HAT on a Raspberry Pi header.

use thiserror::Error;

use crate::gpio::PinId;
use crate::peripheral::SpiConfig;

/// Driver name
pub const DRIVER_NAME: &str = "EPD 7in3e";

/// Driver version (synchronized with Cargo.toml)
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Full version descriptor
pub const VERSION_STRING: &str = concat!("EPD 7in3e driver v", env!("CARGO_PKG_VERSION"));

/// Default busy-wait budget for one controller operation.
///
/// A full Spectra 6 refresh takes around 20 s.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 40_000;

/// BCM pin numbers of the panel control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PinConfig {
    /// Reset (output, active low)
    pub rst: PinId,
    /// Data/command select (output)
    pub dc: PinId,
    /// Busy (input, low while the controller works)
    pub busy: PinId,
    /// Module power enable (output)
    pub pwr: PinId,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            rst: 17,
            dc: 25,
            busy: 24,
            pwr: 18,
        }
    }
}

impl PinConfig {
    /// All pins in acquisition order.
    pub fn all(&self) -> [PinId; 4] {
        [self.rst, self.dc, self.pwr, self.busy]
    }
}

/// Complete hardware configuration for one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceConfig {
    /// Control line pin map
    pub pins: PinConfig,
    /// spidev node
    pub spi_path: String,
    /// SPI bus settings
    pub spi: SpiConfig,
    /// Busy-wait budget per controller operation, in milliseconds
    pub busy_timeout_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            spi_path: "/dev/spidev0.0".into(),
            spi: SpiConfig::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two control lines share a pin.
    #[error("pin {pin} is assigned to more than one control line")]
    DuplicatePin {
        /// The shared pin
        pin: PinId,
    },
    /// SPI clock of zero.
    #[error("SPI frequency must be non-zero")]
    ZeroFrequency,
    /// Busy budget of zero.
    #[error("busy timeout must be non-zero")]
    ZeroBusyTimeout,
    /// Empty spidev path.
    #[error("SPI device path is empty")]
    EmptySpiPath,
}

impl DeviceConfig {
    /// Check the configuration before any hardware is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pins = self.pins.all();
        for (i, pin) in pins.iter().enumerate() {
            if pins.iter().skip(i.saturating_add(1)).any(|other| other == pin) {
                return Err(ConfigError::DuplicatePin { pin: *pin });
            }
        }
        if self.spi.frequency == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusyTimeout);
        }
        if self.spi_path.is_empty() {
            return Err(ConfigError::EmptySpiPath);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        assert!(VERSION_STRING.starts_with("EPD 7in3e driver v"));
        assert!(VERSION_STRING.ends_with(DRIVER_VERSION));
        assert!(VERSION_STRING.starts_with(DRIVER_NAME));
    }

    #[test]
    fn test_default_config_is_waveshare_hat() {
        let config = DeviceConfig::default();
        assert_eq!(config.pins.rst, 17);
        assert_eq!(config.pins.dc, 25);
        assert_eq!(config.pins.busy, 24);
        assert_eq!(config.pins.pwr, 18);
        assert_eq!(config.spi_path, "/dev/spidev0.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_pin_rejected() {
        let mut config = DeviceConfig::default();
        config.pins.dc = config.pins.rst;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicatePin { pin: 17 })
        );
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = DeviceConfig::default();
        config.spi.frequency = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroFrequency));

        let mut config = DeviceConfig::default();
        config.busy_timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroBusyTimeout));

        let mut config = DeviceConfig::default();
        config.spi_path.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptySpiPath));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_round_trip() {
        let config = DeviceConfig {
            spi_path: "/dev/spidev0.1".into(),
            busy_timeout_ms: 1_000,
            ..DeviceConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_uses_defaults() {
        let back: DeviceConfig =
            serde_json::from_str(r#"{ "pins": { "busy": 5 }, "spi_path": "/dev/spidev1.0" }"#)
                .unwrap();
        assert_eq!(back.pins.busy, 5);
        assert_eq!(back.pins.rst, 17);
        assert_eq!(back.spi_path, "/dev/spidev1.0");
        assert_eq!(back.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }
}
