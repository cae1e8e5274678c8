//! End-to-end lifecycle over the simulated GPIO chip and SPI bus.
//!
//! Exercises `Device` → `PanelModule` → `Epd7in3e` → `GpioLines` without
//! hardware, checking what actually reaches the pins and the bus.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use epd::display::driver::Command;
use epd::display::PanelModule;
use epd::{Color, Device, DeviceState, EpdError, ErrorKind, FrameBuffer, InitStage};
use platform::mocks::{NoDelay, SimBackend, SimSpi, SimSpiOpener};
use platform::{DeviceConfig, GpioError, GpioLines, LineBackend, PinId, PinState};

const RST: PinId = 17;
const DC: PinId = 25;
const BUSY: PinId = 24;
const PWR: PinId = 18;

type SimDevice = Device<PanelModule<SimBackend, SimSpiOpener, NoDelay>>;

struct Bench {
    chip: SimBackend,
    lines: GpioLines<SimBackend>,
    spi: SimSpi,
    opener: SimSpiOpener,
}

impl Bench {
    fn new() -> Self {
        let chip = SimBackend::with_lines([RST, DC, BUSY, PWR]);
        // BUSY is active low: high means the controller is idle.
        chip.set_level(BUSY, PinState::High);
        let spi = SimSpi::attached(chip.clone(), DC);
        Self {
            lines: GpioLines::new(chip.clone()),
            opener: SimSpiOpener::new(spi.clone()),
            chip,
            spi,
        }
    }

    fn device(&self) -> SimDevice {
        let module = PanelModule::new(
            self.lines.clone(),
            self.opener.clone(),
            NoDelay,
            &DeviceConfig::default(),
        )
        .unwrap();
        Device::new(module)
    }
}

#[test]
fn display_before_and_after_initialize() {
    let bench = Bench::new();
    let mut device = bench.device();

    assert_eq!(device.buffer_size(), 192_000);
    let frame = device.allocate_buffer(Color::White).unwrap();

    assert_eq!(device.display(&frame), Err(EpdError::NotInitialized));
    assert!(bench.spi.frames().is_empty(), "nothing may reach the bus before initialize");
    assert!(!bench.chip.is_exported(RST));

    device.initialize().unwrap();
    assert_eq!(device.state(), DeviceState::Ready);
    assert_eq!(bench.chip.level(PWR), Some(PinState::High));

    bench.spi.clear();
    device.display(&frame).unwrap();

    let sent = bench
        .spi
        .data_after(Command::DataStartTransmission as u8)
        .expect("frame data was sent");
    assert_eq!(sent.len(), 192_000);
    assert!(sent.iter().all(|&b| b == 0x11), "white is 0x1 on the wire");
    assert!(bench.spi.commands().contains(&(Command::DisplayRefresh as u8)));
}

#[test]
fn blue_and_green_are_translated_on_the_wire() {
    let bench = Bench::new();
    let mut device = bench.device();
    device.initialize().unwrap();

    let mut frame = device.allocate_buffer(Color::Blue).unwrap();
    frame.set_color(1, 0, Color::Green).unwrap();
    bench.spi.clear();
    device.display(&frame).unwrap();

    let sent = bench
        .spi
        .data_after(Command::DataStartTransmission as u8)
        .unwrap();
    assert_eq!(sent.first(), Some(&0x56));
    assert_eq!(sent.get(1), Some(&0x55));
}

#[test]
fn second_device_on_shared_lines_cannot_initialize() {
    let bench = Bench::new();
    let mut first = bench.device();
    let mut second = bench.device();

    first.initialize().unwrap();
    let err = second.initialize().unwrap_err();

    assert!(matches!(
        err,
        EpdError::InitializationFailed {
            stage: InitStage::ModuleInit,
            ..
        }
    ));
    assert!(matches!(
        err.gpio_cause(),
        Some(GpioError::LineUnavailable { pin: RST, .. })
    ));
    assert_eq!(err.kind(), ErrorKind::InitializationFailed);
    assert_eq!(second.state(), DeviceState::Uninitialized);

    // The failed attempt must not disturb the ready device.
    first.clear(Color::Red).unwrap();

    first.shutdown().unwrap();
    second.initialize().unwrap();
    assert!(second.is_ready());
}

#[test]
fn shutdown_releases_every_line() {
    let bench = Bench::new();
    let mut device = bench.device();
    device.initialize().unwrap();
    device.shutdown().unwrap();

    for pin in [RST, DC, BUSY, PWR] {
        assert!(!bench.lines.is_held(pin), "GPIO{pin} still held after shutdown");
        assert!(!bench.chip.is_exported(pin), "GPIO{pin} still exported after shutdown");
    }
    assert_eq!(bench.chip.level(PWR), Some(PinState::Low));

    device.shutdown().unwrap();
    assert_eq!(device.clear(Color::White), Err(EpdError::NotInitialized));
}

#[test]
fn spi_failure_leaves_device_retryable() {
    let bench = Bench::new();
    let mut device = bench.device();

    bench.opener.set_failing(true);
    let err = device.initialize().unwrap_err();
    assert!(matches!(
        err,
        EpdError::InitializationFailed {
            stage: InitStage::ModuleInit,
            cause: None,
            ..
        }
    ));
    assert!(!bench.lines.is_held(RST));

    bench.opener.set_failing(false);
    device.initialize().unwrap();
    assert!(device.is_ready());
}

#[test]
fn stuck_busy_times_out_panel_init() {
    let bench = Bench::new();
    let config = DeviceConfig {
        busy_timeout_ms: 50,
        ..DeviceConfig::default()
    };
    let module =
        PanelModule::new(bench.lines.clone(), bench.opener.clone(), NoDelay, &config).unwrap();
    let mut device = Device::new(module);

    bench.chip.set_level(BUSY, PinState::Low);
    let err = device.initialize().unwrap_err();
    assert!(matches!(
        err,
        EpdError::InitializationFailed {
            stage: InitStage::PanelInit,
            ..
        }
    ));
    // The module was closed again after the failed panel init.
    assert!(!bench.lines.is_held(PWR));
}

#[test]
fn host_rendered_pattern_reaches_panel() {
    let bench = Bench::new();
    let mut device = bench.device();
    device.initialize().unwrap();

    let frame = FrameBuffer::full_color_test_pattern(device.width(), device.height()).unwrap();
    bench.spi.clear();
    device.display(&frame).unwrap();

    let sent = bench
        .spi
        .data_after(Command::DataStartTransmission as u8)
        .unwrap();
    assert_eq!(sent.len(), device.buffer_size());
}

#[test]
fn devices_with_separate_registries_cannot_share_a_panel() {
    let bench = Bench::new();
    let mut first = bench.device();
    let mut second = Device::new(
        PanelModule::new(
            GpioLines::new(bench.chip.clone()),
            bench.opener.clone(),
            NoDelay,
            &DeviceConfig::default(),
        )
        .unwrap(),
    );

    first.initialize().unwrap();
    let err = second.initialize().unwrap_err();
    assert!(matches!(
        err.gpio_cause(),
        Some(GpioError::LineUnavailable { pin: RST, .. })
    ));
    assert!(!second.is_ready());

    // The losing device must not have unexported the winner's lines.
    for pin in [RST, DC, BUSY, PWR] {
        assert!(bench.chip.is_exported(pin), "GPIO{pin} lost by the ready device");
    }
    first.clear(Color::Green).unwrap();
}

#[test]
fn pin_failure_during_command_is_reported_as_gpio() {
    let bench = Bench::new();
    let mut device = bench.device();
    device.initialize().unwrap();

    // DC vanishes from under the ready device.
    bench.chip.clone().unexport(DC).unwrap();

    let err = device.clear(Color::Red).unwrap_err();
    assert!(
        matches!(err, EpdError::Gpio(GpioError::Io { pin: DC, .. })),
        "got {err:?}"
    );
    assert!(matches!(err.gpio_cause(), Some(GpioError::Io { pin: DC, .. })));
    assert_eq!(err.kind(), ErrorKind::Hardware);
}
