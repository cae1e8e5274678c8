//! Panel module bring-up
//!
//! [`PanelModule`] owns everything the controller driver needs between
//! `module_init` and `module_exit`: the RST, DC, BUSY and PWR lines and the
//! SPI device. It implements [`PanelProtocol`] on top of [`Epd7in3e`].

use embedded_hal::delay::DelayNs;
use platform::{
    ConfigError, DeviceConfig, Direction, DisplayInfo, GpioError, GpioLines, Line, LineBackend,
    PanelProtocol, PinConfig, PinId, PinState, SpiOpener,
};
use thiserror::Error;

use super::driver::{DisplayError, Epd7in3e};
use super::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// Errors from the panel module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// A panel command was issued while the module is closed.
    #[error("panel module is not open")]
    NotOpen,
    /// Acquiring or driving a control line failed.
    #[error("GPIO: {0}")]
    Gpio(#[from] GpioError),
    /// The SPI device could not be opened.
    #[error("cannot open SPI device: {0}")]
    Spi(String),
    /// The controller driver failed.
    #[error("controller: {0}")]
    Display(#[from] DisplayError<GpioError>),
    /// The delay provider is still held by a driver.
    #[error("delay provider unavailable")]
    DelayUnavailable,
}

type ModuleDriver<B, S, D> = Epd7in3e<S, Line<B>, Line<B>, Line<B>, D>;

/// Lines and bus held between a successful bring-up and the driver.
struct Parts<B: LineBackend, S> {
    spi: S,
    rst: Line<B>,
    dc: Line<B>,
    busy: Line<B>,
    pwr: Line<B>,
}

struct OpenModule<B: LineBackend, S, D> {
    driver: ModuleDriver<B, S, D>,
    pwr: Line<B>,
}

/// Vendor-layer panel module over a GPIO backend, an SPI opener and a delay.
pub struct PanelModule<B: LineBackend, O: SpiOpener, D> {
    lines: GpioLines<B>,
    opener: O,
    pins: PinConfig,
    busy_timeout_ms: u32,
    delay: Option<D>,
    open: Option<OpenModule<B, O::Spi, D>>,
}

impl<B, O, D> PanelModule<B, O, D>
where
    B: LineBackend,
    O: SpiOpener,
{
    /// Module using `config` for pins and BUSY budget.
    ///
    /// Modules that share `lines` cannot hold the same pin at once.
    pub fn new(
        lines: GpioLines<B>,
        opener: O,
        delay: D,
        config: &DeviceConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            lines,
            opener,
            pins: config.pins,
            busy_timeout_ms: config.busy_timeout_ms,
            delay: Some(delay),
            open: None,
        })
    }

    /// Whether `module_init` has succeeded and `module_exit` has not run.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn output(&self, pin: PinId) -> Result<Line<B>, GpioError> {
        let mut line = self.lines.acquire(pin)?;
        line.set_direction(Direction::Output)?;
        Ok(line)
    }

    fn driver(&mut self) -> Result<&mut ModuleDriver<B, O::Spi, D>, ModuleError> {
        self.open
            .as_mut()
            .map(|open| &mut open.driver)
            .ok_or(ModuleError::NotOpen)
    }

    /// Acquire the control lines, raise PWR and open SPI.
    ///
    /// Lines acquired before a failing step are released on drop; PWR is
    /// dropped low first when the SPI open fails.
    fn bring_up(&mut self) -> Result<Parts<B, O::Spi>, ModuleError> {
        let rst = self.output(self.pins.rst)?;
        let dc = self.output(self.pins.dc)?;
        let mut pwr = self.output(self.pins.pwr)?;
        let mut busy = self.lines.acquire(self.pins.busy)?;
        busy.set_direction(Direction::Input)?;

        pwr.write(PinState::High)?;

        let spi = match self.opener.open() {
            Ok(spi) => spi,
            Err(e) => {
                if let Err(off) = pwr.write(PinState::Low) {
                    tracing::warn!(error = %off, "failed to drop PWR after SPI open failure");
                }
                return Err(ModuleError::Spi(e.to_string()));
            }
        };
        Ok(Parts {
            spi,
            rst,
            dc,
            busy,
            pwr,
        })
    }

    /// Drive RST, DC and PWR low, close SPI and release every line.
    fn close(&mut self) -> Result<(), ModuleError> {
        let Some(OpenModule { driver, mut pwr }) = self.open.take() else {
            return Ok(());
        };
        let (spi, mut dc, mut rst, mut busy, delay) = driver.release();
        self.delay = Some(delay);

        let mut first_error: Option<GpioError> = None;
        for line in [&mut rst, &mut dc, &mut pwr] {
            if let Err(e) = line.write(PinState::Low) {
                first_error.get_or_insert(e);
            }
        }
        drop(spi);
        for line in [&mut rst, &mut dc, &mut pwr, &mut busy] {
            if let Err(e) = line.release() {
                first_error.get_or_insert(e);
            }
        }
        tracing::info!("panel module down");

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl<B, O, D> PanelProtocol for PanelModule<B, O, D>
where
    B: LineBackend,
    O: SpiOpener,
    D: DelayNs,
{
    type Error = ModuleError;

    fn info(&self) -> DisplayInfo {
        DisplayInfo {
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
        }
    }

    fn module_init(&mut self) -> Result<(), ModuleError> {
        if self.open.is_some() {
            return Ok(());
        }

        // The delay is claimed before any line moves, so a missing delay
        // never leaves PWR raised.
        let delay = self.delay.take().ok_or(ModuleError::DelayUnavailable)?;
        let Parts {
            spi,
            rst,
            dc,
            busy,
            pwr,
        } = match self.bring_up() {
            Ok(parts) => parts,
            Err(e) => {
                self.delay = Some(delay);
                return Err(e);
            }
        };

        let driver = Epd7in3e::new(spi, dc, rst, busy, delay).with_busy_timeout(self.busy_timeout_ms);
        self.open = Some(OpenModule { driver, pwr });
        tracing::info!(
            rst = self.pins.rst,
            dc = self.pins.dc,
            busy = self.pins.busy,
            pwr = self.pins.pwr,
            "panel module up"
        );
        Ok(())
    }

    fn module_exit(&mut self) -> Result<(), ModuleError> {
        self.close()
    }

    fn panel_init(&mut self) -> Result<(), ModuleError> {
        Ok(self.driver()?.init()?)
    }

    fn panel_clear(&mut self, color: u8) -> Result<(), ModuleError> {
        Ok(self.driver()?.clear(color)?)
    }

    fn panel_show(&mut self) -> Result<(), ModuleError> {
        Ok(self.driver()?.show_test_pattern()?)
    }

    fn panel_show_block(&mut self) -> Result<(), ModuleError> {
        Ok(self.driver()?.show_block_pattern()?)
    }

    fn panel_display(&mut self, packed: &[u8]) -> Result<(), ModuleError> {
        Ok(self.driver()?.display(packed)?)
    }

    fn panel_sleep(&mut self) -> Result<(), ModuleError> {
        Ok(self.driver()?.sleep()?)
    }
}

impl<B: LineBackend, O: SpiOpener, D> Drop for PanelModule<B, O, D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "panel module teardown on drop failed");
        }
    }
}

#[cfg(feature = "linux")]
mod linux {
    use platform::linux::{sysfs_lines, SpidevOpener, SysfsBackend};
    use platform::{ConfigError, DeviceConfig};

    use super::PanelModule;

    /// Panel module on a Raspberry Pi: sysfs GPIO, spidev and a sleeping
    /// delay.
    pub type LinuxPanelModule = PanelModule<SysfsBackend, SpidevOpener, linux_embedded_hal::Delay>;

    impl LinuxPanelModule {
        /// Module for the hardware described by `config`.
        ///
        /// Every Linux module in the process shares one line registry, so a
        /// second module on the same pins fails to initialize.
        pub fn linux(config: &DeviceConfig) -> Result<Self, ConfigError> {
            Self::new(
                sysfs_lines(),
                SpidevOpener::new(config.spi_path.clone(), config.spi),
                linux_embedded_hal::Delay,
                config,
            )
        }
    }
}

#[cfg(feature = "linux")]
pub use linux::LinuxPanelModule;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use platform::mocks::{NoDelay, SimBackend, SimSpi, SimSpiOpener};

    const RST: PinId = 17;
    const DC: PinId = 25;
    const BUSY: PinId = 24;
    const PWR: PinId = 18;

    struct Rig {
        chip: SimBackend,
        lines: GpioLines<SimBackend>,
        spi: SimSpi,
        opener: SimSpiOpener,
    }

    fn rig() -> Rig {
        let chip = SimBackend::with_lines([RST, DC, BUSY, PWR]);
        chip.set_level(BUSY, PinState::High);
        let spi = SimSpi::attached(chip.clone(), DC);
        Rig {
            lines: GpioLines::new(chip.clone()),
            opener: SimSpiOpener::new(spi.clone()),
            chip,
            spi,
        }
    }

    fn module(rig: &Rig) -> PanelModule<SimBackend, SimSpiOpener, NoDelay> {
        PanelModule::new(
            rig.lines.clone(),
            rig.opener.clone(),
            NoDelay,
            &DeviceConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let rig = rig();
        let config = DeviceConfig {
            busy_timeout_ms: 0,
            ..DeviceConfig::default()
        };
        let result = PanelModule::new(rig.lines.clone(), rig.opener.clone(), NoDelay, &config);
        assert!(matches!(result, Err(ConfigError::ZeroBusyTimeout)));
    }

    #[test]
    fn test_init_drives_pwr_high_and_holds_lines() {
        let rig = rig();
        let mut module = module(&rig);
        module.module_init().unwrap();

        assert!(module.is_open());
        assert_eq!(rig.chip.level(PWR), Some(PinState::High));
        assert_eq!(rig.chip.direction(BUSY), Some(Direction::Input));
        assert_eq!(rig.chip.direction(RST), Some(Direction::Output));
        for pin in [RST, DC, BUSY, PWR] {
            assert!(rig.lines.is_held(pin), "GPIO{pin} must be held while open");
        }
        assert_eq!(rig.opener.open_count(), 1);
    }

    #[test]
    fn test_exit_drives_lines_low_and_frees_them() {
        let rig = rig();
        let mut module = module(&rig);
        module.module_init().unwrap();
        module.module_exit().unwrap();

        assert!(!module.is_open());
        for pin in [RST, DC, PWR] {
            assert_eq!(
                rig.chip.writes(pin).last(),
                Some(&PinState::Low),
                "GPIO{pin} must be driven low on exit"
            );
        }
        for pin in [RST, DC, BUSY, PWR] {
            assert!(!rig.lines.is_held(pin));
            assert!(!rig.chip.is_exported(pin));
        }

        // Exit while closed is a no-op; init works again.
        module.module_exit().unwrap();
        module.module_init().unwrap();
    }

    #[test]
    fn test_second_module_cannot_take_held_lines() {
        let rig = rig();
        let mut first = module(&rig);
        let mut second = module(&rig);
        first.module_init().unwrap();

        let err = second.module_init().unwrap_err();
        assert!(
            matches!(
                err,
                ModuleError::Gpio(GpioError::LineUnavailable { pin: RST, .. })
            ),
            "got {err:?}"
        );
        assert!(!second.is_open());
        assert!(rig.lines.is_held(RST), "first module keeps its lines");
    }

    #[test]
    fn test_spi_failure_releases_everything() {
        let rig = rig();
        rig.opener.set_failing(true);
        let mut module = module(&rig);

        let err = module.module_init().unwrap_err();
        assert!(matches!(err, ModuleError::Spi(_)));
        assert_eq!(rig.chip.level(PWR), Some(PinState::Low));
        for pin in [RST, DC, BUSY, PWR] {
            assert!(!rig.lines.is_held(pin));
        }

        rig.opener.set_failing(false);
        module.module_init().unwrap();
    }

    #[test]
    fn test_panel_calls_require_open_module() {
        let rig = rig();
        let mut module = module(&rig);
        assert_eq!(module.panel_init(), Err(ModuleError::NotOpen));
        assert_eq!(module.panel_clear(1), Err(ModuleError::NotOpen));
        assert_eq!(module.panel_display(&[]), Err(ModuleError::NotOpen));
        assert_eq!(module.panel_sleep(), Err(ModuleError::NotOpen));
        assert!(rig.spi.frames().is_empty());
    }

    #[test]
    fn test_panel_init_over_simulated_bus() {
        let rig = rig();
        let mut module = module(&rig);
        module.module_init().unwrap();
        module.panel_init().unwrap();

        let commands = rig.spi.commands();
        assert_eq!(commands.first(), Some(&0xAA));
        assert_eq!(commands.last(), Some(&0x04));
        assert_eq!(rig.spi.data_after(0x61), Some(vec![0x03, 0x20, 0x01, 0xE0]));
        assert_eq!(
            rig.chip.writes(RST),
            vec![PinState::High, PinState::Low, PinState::High]
        );
    }

    #[test]
    fn test_busy_stuck_low_times_out() {
        let rig = rig();
        rig.chip.set_level(BUSY, PinState::Low);
        let config = DeviceConfig {
            busy_timeout_ms: 50,
            ..DeviceConfig::default()
        };
        let mut module =
            PanelModule::new(rig.lines.clone(), rig.opener.clone(), NoDelay, &config).unwrap();
        module.module_init().unwrap();
        assert_eq!(
            module.panel_init(),
            Err(ModuleError::Display(DisplayError::Timeout))
        );
    }

    #[test]
    fn test_missing_delay_touches_no_line() {
        let rig = rig();
        let mut module = module(&rig);
        module.delay = None;

        assert_eq!(module.module_init(), Err(ModuleError::DelayUnavailable));
        assert!(rig.chip.writes(PWR).is_empty(), "PWR must never be raised");
        for pin in [RST, DC, BUSY, PWR] {
            assert!(!rig.lines.is_held(pin));
            assert!(!rig.chip.is_exported(pin));
        }
        assert_eq!(rig.opener.open_count(), 0);
    }

    #[test]
    fn test_failed_bring_up_keeps_delay_for_retry() {
        let rig = rig();
        let mut module = module(&rig);
        rig.chip.fail_direction(DC);

        assert!(matches!(
            module.module_init(),
            Err(ModuleError::Gpio(GpioError::Configuration { pin: DC, .. }))
        ));
        assert!(module.delay.is_some());
    }

    #[test]
    fn test_pin_failure_keeps_gpio_error() {
        let rig = rig();
        let mut module = module(&rig);
        module.module_init().unwrap();
        module.panel_init().unwrap();

        // The DC line disappears underneath the open module.
        rig.chip.clone().unexport(DC).unwrap();

        let err = module.panel_clear(crate::display::RED).unwrap_err();
        assert!(
            matches!(
                err,
                ModuleError::Display(DisplayError::Gpio(GpioError::Io { pin: DC, .. }))
            ),
            "got {err:?}"
        );
        let source = std::error::Error::source(&err).and_then(|e| e.source());
        assert!(
            source.is_some_and(|e| e.downcast_ref::<GpioError>().is_some()),
            "GPIO error must stay reachable through the source chain"
        );
    }

    #[test]
    fn test_info_reports_panel_geometry() {
        let rig = rig();
        let module = module(&rig);
        assert_eq!(
            module.info(),
            DisplayInfo {
                width: 800,
                height: 480
            }
        );
    }
}
