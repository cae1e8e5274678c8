//! Linux backends
//!
//! [`SysfsBackend`] drives GPIO lines through `/sys/class/gpio` and
//! [`SpidevOpener`] opens a `/dev/spidevB.C` node, both via
//! `linux-embedded-hal`.

use std::sync::OnceLock;
use std::time::Duration;

use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio;
use linux_embedded_hal::SpidevDevice;
use thiserror::Error;

use crate::gpio::{Direction, GpioLines, LineBackend, PinId, PinState};
use crate::peripheral::{SpiConfig, SpiMode, SpiOpener};

/// How many times to poll for the sysfs node after an export.
const EXPORT_POLL_ATTEMPTS: u32 = 100;

/// Interval between export polls.
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from the sysfs GPIO backend.
#[derive(Debug, Error)]
pub enum SysfsError {
    /// sysfs call failed.
    #[error("sysfs: {0}")]
    Sysfs(#[from] sysfs_gpio::Error),
    /// The pin is already exported, by this process or another one.
    #[error("GPIO{0} is already exported")]
    AlreadyExported(PinId),
    /// The export never showed up under `/sys/class/gpio`.
    #[error("GPIO{0} did not appear after export")]
    ExportTimeout(PinId),
}

/// GPIO backend over the sysfs interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsBackend;

impl SysfsBackend {
    fn pin(pin: PinId) -> sysfs_gpio::Pin {
        sysfs_gpio::Pin::new(u64::from(pin))
    }
}

impl LineBackend for SysfsBackend {
    type Error = SysfsError;

    fn export(&mut self, pin: PinId) -> Result<(), SysfsError> {
        let gpio = Self::pin(pin);
        // `Pin::export` succeeds on an exported pin; refuse to share it.
        if gpio.is_exported() {
            return Err(SysfsError::AlreadyExported(pin));
        }
        gpio.export()?;

        // udev may need a moment to create the attribute files.
        for _ in 0..EXPORT_POLL_ATTEMPTS {
            if gpio.is_exported() {
                return Ok(());
            }
            std::thread::sleep(EXPORT_POLL_INTERVAL);
        }
        if gpio.is_exported() {
            Ok(())
        } else {
            Err(SysfsError::ExportTimeout(pin))
        }
    }

    fn unexport(&mut self, pin: PinId) -> Result<(), SysfsError> {
        Self::pin(pin).unexport()?;
        Ok(())
    }

    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), SysfsError> {
        let direction = match direction {
            Direction::Input => sysfs_gpio::Direction::In,
            Direction::Output => sysfs_gpio::Direction::Out,
        };
        Self::pin(pin).set_direction(direction)?;
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> Result<PinState, SysfsError> {
        let value = Self::pin(pin).get_value()?;
        Ok(PinState::from(value != 0))
    }

    fn write(&mut self, pin: PinId, state: PinState) -> Result<(), SysfsError> {
        Self::pin(pin).set_value(u8::from(state.is_high()))?;
        Ok(())
    }
}

/// Line registry shared by every sysfs user in this process.
///
/// Modules built on separate registries would not see each other's pins;
/// hand out clones of this one instead.
pub fn sysfs_lines() -> GpioLines<SysfsBackend> {
    static LINES: OnceLock<GpioLines<SysfsBackend>> = OnceLock::new();
    LINES.get_or_init(|| GpioLines::new(SysfsBackend)).clone()
}

/// Errors from opening the spidev node.
#[derive(Debug, Error)]
pub enum SpidevError {
    /// The node could not be opened.
    #[error("cannot open {path}: {reason}")]
    Open {
        /// Device path
        path: String,
        /// OS explanation
        reason: String,
    },
    /// The node rejected the bus settings.
    #[error("cannot configure {path}: {source}")]
    Configure {
        /// Device path
        path: String,
        /// OS error
        source: std::io::Error,
    },
}

/// [`SpiOpener`] for a spidev node.
#[derive(Debug, Clone)]
pub struct SpidevOpener {
    path: String,
    config: SpiConfig,
}

impl SpidevOpener {
    /// Opener for `path` with the given bus settings.
    pub fn new(path: impl Into<String>, config: SpiConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// Device path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn mode_flags(mode: SpiMode) -> SpiModeFlags {
    match mode {
        SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
        SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
        SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
        SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
    }
}

impl SpiOpener for SpidevOpener {
    type Spi = SpidevDevice;
    type Error = SpidevError;

    fn open(&mut self) -> Result<SpidevDevice, SpidevError> {
        let mut spi = SpidevDevice::open(&self.path).map_err(|e| SpidevError::Open {
            path: self.path.clone(),
            reason: format!("{e:?}"),
        })?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(self.config.frequency)
            .mode(mode_flags(self.config.mode))
            .build();
        spi.configure(&options)
            .map_err(|source| SpidevError::Configure {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(
            path = %self.path,
            frequency = self.config.frequency,
            "SPI device opened"
        );
        Ok(spi)
    }
}
