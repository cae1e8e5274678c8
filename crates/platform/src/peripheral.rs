//! Peripheral abstraction layer
//!
//! SPI bus settings and the seam through which the panel module opens its
//! SPI device at bring-up time.

use embedded_hal::spi::SpiDevice;

/// Opens the SPI device the panel protocol runs on.
///
/// Called once per module bring-up; the returned device is dropped (and the
/// bus closed) at module exit.
pub trait SpiOpener {
    /// Device handed to the protocol driver
    type Spi: SpiDevice;
    /// Error type
    type Error: core::fmt::Display;

    /// Open and configure the device.
    fn open(&mut self) -> Result<Self::Spi, Self::Error>;
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// SPI mode (CPOL, CPHA)
    pub mode: SpiMode,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 10_000_000,
            mode: SpiMode::Mode0,
        }
    }
}

/// SPI modes (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<SpiMode> for embedded_hal::spi::Mode {
    fn from(mode: SpiMode) -> Self {
        match mode {
            SpiMode::Mode0 => embedded_hal::spi::MODE_0,
            SpiMode::Mode1 => embedded_hal::spi::MODE_1,
            SpiMode::Mode2 => embedded_hal::spi::MODE_2,
            SpiMode::Mode3 => embedded_hal::spi::MODE_3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{Phase, Polarity};

    #[test]
    fn test_default_spi_config() {
        let config = SpiConfig::default();
        assert_eq!(config.frequency, 10_000_000);
        assert_eq!(config.mode, SpiMode::Mode0);
    }

    #[test]
    fn test_mode_conversion() {
        let mode: embedded_hal::spi::Mode = SpiMode::Mode3.into();
        assert_eq!(mode.polarity, Polarity::IdleHigh);
        assert_eq!(mode.phase, Phase::CaptureOnSecondTransition);
    }
}
