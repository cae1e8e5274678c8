//! 7.3" Spectra 6 (E) controller driver
//!
//! Blocking driver for the controller on the Waveshare 7.3" (E) panel,
//! 800×480, six colors at 4 bits per pixel.
//!
//! # Wiring (Raspberry Pi, Waveshare e-Paper HAT)
//!
//! | Signal | BCM pin | Direction |
//! |--------|---------|-----------|
//! | SCLK   | 11 (SPI0_SCLK) | Host → Display |
//! | MOSI   | 10 (SPI0_MOSI) | Host → Display |
//! | CS     | Managed by `SpiDevice` | Host → Display |
//! | DC     | 25 | Host → Display |
//! | RST    | 17 | Host → Display |
//! | BUSY   | 24 | Display → Host |
//! | PWR    | 18 | Host → Display |
//!
//! # Color codes
//!
//! Frames arrive as palette indices (black 0, white 1, yellow 2, red 3,
//! blue 4, green 5). The controller numbers blue and green 5 and 6, so every
//! byte is translated on its way to the wire. Callers never see controller
//! codes.
//!
//! # BUSY
//!
//! BUSY is active LOW on this controller: the line reads high once the
//! controller is idle.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;
use thiserror::Error;

use super::FRAMEBUFFER_SIZE;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Palette code for black.
pub const BLACK: u8 = 0x0;
/// Palette code for white.
pub const WHITE: u8 = 0x1;
/// Palette code for yellow.
pub const YELLOW: u8 = 0x2;
/// Palette code for red.
pub const RED: u8 = 0x3;
/// Palette code for blue.
pub const BLUE: u8 = 0x4;
/// Palette code for green.
pub const GREEN: u8 = 0x5;

/// Largest single SPI write (default spidev `bufsiz`).
pub const MAX_TRANSFER: usize = 4096;

/// Default BUSY budget per controller operation.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = platform::config::DEFAULT_BUSY_TIMEOUT_MS;

/// BUSY poll interval.
const BUSY_POLL_MS: u32 = 10;

/// Color order of both built-in test patterns.
const PATTERN_COLORS: [u8; 6] = [BLACK, YELLOW, RED, BLUE, GREEN, WHITE];

/// Bytes per panel row: 800 pixels / 2.
const ROW_BYTES: usize = super::DISPLAY_WIDTH.div_ceil(2) as usize;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// Controller command codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Panel setting (PSR): 2 data bytes.
    PanelSetting = 0x00,
    /// Power setting (PWR): 1 data byte.
    PowerSetting = 0x01,
    /// Power off (POF): 1 data byte; wait BUSY after.
    PowerOff = 0x02,
    /// Power off sequence (POFS): 4 data bytes.
    PowerOffSequence = 0x03,
    /// Power on (PON): wait BUSY after.
    PowerOn = 0x04,
    /// Booster soft start 1 (BTST1): 4 data bytes.
    BoosterSoftStart1 = 0x05,
    /// Booster soft start 2 (BTST2): 4 data bytes.
    BoosterSoftStart2 = 0x06,
    /// Deep sleep (DSLP): 1 data byte (0xA5 check code).
    DeepSleep = 0x07,
    /// Booster soft start 3 (BTST3): 4 data bytes.
    BoosterSoftStart3 = 0x08,
    /// Data start transmission (DTM): one full frame of pixel data.
    DataStartTransmission = 0x10,
    /// Display refresh (DRF): 1 data byte; wait BUSY after.
    DisplayRefresh = 0x12,
    /// PLL control: 1 data byte.
    PllControl = 0x30,
    /// VCOM and data interval (CDI): 1 data byte.
    VcomDataInterval = 0x50,
    /// TCON setting: 2 data bytes.
    TconSetting = 0x60,
    /// Resolution setting (TRES): 4 data bytes, width and height big-endian.
    ResolutionSetting = 0x61,
    /// T_VDCS: 1 data byte.
    TVdcs = 0x84,
    /// Power saving (PWS): 1 data byte.
    PowerSaving = 0xE3,
    /// Command header (CMDH): 6 data bytes, unlocks the register set.
    CommandHeader = 0xAA,
}

/// Register configuration sent by [`Epd7in3e::init`], in order.
pub const INIT_SEQUENCE: &[(Command, &[u8])] = &[
    (Command::CommandHeader, &[0x49, 0x55, 0x20, 0x08, 0x09, 0x18]),
    (Command::PowerSetting, &[0x3F]),
    (Command::PanelSetting, &[0x5F, 0x69]),
    (Command::PowerOffSequence, &[0x00, 0x54, 0x00, 0x44]),
    (Command::BoosterSoftStart1, &[0x40, 0x1F, 0x1F, 0x2C]),
    (Command::BoosterSoftStart2, &[0x6F, 0x1F, 0x17, 0x49]),
    (Command::BoosterSoftStart3, &[0x6F, 0x1F, 0x1F, 0x22]),
    (Command::PllControl, &[0x03]),
    (Command::VcomDataInterval, &[0x3F]),
    (Command::TconSetting, &[0x02, 0x00]),
    // 800 = 0x0320, 480 = 0x01E0
    (Command::ResolutionSetting, &[0x03, 0x20, 0x01, 0xE0]),
    (Command::TVdcs, &[0x01]),
    (Command::PowerSaving, &[0x2F]),
];

// ---------------------------------------------------------------------------
// Wire translation
// ---------------------------------------------------------------------------

/// Controller code for one palette nibble.
const fn wire_nibble(nibble: u8) -> u8 {
    match nibble {
        BLUE => 0x5,
        GREEN => 0x6,
        other => other,
    }
}

/// Palette byte → controller byte, both nibbles translated.
static WIRE_LUT: [u8; 256] = build_wire_lut();

// i < 256 in the loop, and nibbles are <= 0x0F so the shifts cannot overflow.
#[allow(
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation
)]
const fn build_wire_lut() -> [u8; 256] {
    let mut lut = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let byte = i as u8;
        lut[i] = (wire_nibble(byte >> 4) << 4) | wire_nibble(byte & 0x0F);
        i += 1;
    }
    lut
}

/// Translate one packed palette byte to controller codes.
#[inline]
pub fn wire_byte(byte: u8) -> u8 {
    WIRE_LUT.get(usize::from(byte)).copied().unwrap_or(byte)
}

/// Both nibbles set to palette `color`.
const fn packed(color: u8) -> u8 {
    let nibble = color & 0x0F;
    (nibble << 4) | nibble
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by the controller driver.
///
/// `PinE` is the error type shared by the DC, RST and BUSY pins; it is kept
/// as the source of [`DisplayError::Gpio`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError<PinE> {
    /// SPI communication error.
    #[error("SPI communication error")]
    Communication,
    /// A control pin failed.
    #[error("GPIO error: {0}")]
    Gpio(#[source] PinE),
    /// BUSY did not go high within the budget.
    #[error("timed out waiting for BUSY")]
    Timeout,
    /// Caller supplied a frame with the wrong number of bytes.
    #[error("frame must be exactly {} bytes", FRAMEBUFFER_SIZE)]
    InvalidBuffer,
}

// ---------------------------------------------------------------------------
// Driver struct
// ---------------------------------------------------------------------------

/// 7.3" Spectra 6 (E) controller driver.
///
/// Generic over:
/// - `SPI` - a blocking [`SpiDevice`] (manages CS).
/// - `DC`  - Data/Command [`OutputPin`].
/// - `RST` - Reset [`OutputPin`].
/// - `BUSY` - Busy [`InputPin`] (LOW while busy).
/// - `DELAY` - [`DelayNs`] for timing.
///
/// On Linux supply `linux_embedded_hal::Delay`; in host tests supply
/// `embedded_hal_mock::eh1::delay::NoopDelay`.
pub struct Epd7in3e<SPI, DC, RST, BUSY, DELAY> {
    spi: SPI,
    dc: DC,
    rst: RST,
    busy: BUSY,
    delay: DELAY,
    busy_timeout_ms: u32,
}

impl<SPI, DC, RST, BUSY, DELAY> Epd7in3e<SPI, DC, RST, BUSY, DELAY> {
    /// Create a new driver instance. Nothing is sent until `init`.
    pub fn new(spi: SPI, dc: DC, rst: RST, busy: BUSY, delay: DELAY) -> Self {
        Self {
            spi,
            dc,
            rst,
            busy,
            delay,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    /// Override the BUSY budget per operation.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout_ms: u32) -> Self {
        self.busy_timeout_ms = timeout_ms;
        self
    }

    /// Give the peripherals back.
    pub fn release(self) -> (SPI, DC, RST, BUSY, DELAY) {
        (self.spi, self.dc, self.rst, self.busy, self.delay)
    }
}

impl<SPI, DC, RST, BUSY, DELAY, PinE> Epd7in3e<SPI, DC, RST, BUSY, DELAY>
where
    SPI: SpiDevice,
    DC: OutputPin<Error = PinE>,
    RST: OutputPin<Error = PinE>,
    BUSY: InputPin<Error = PinE>,
    DELAY: DelayNs,
{
    // -----------------------------------------------------------------------
    // Low-level SPI helpers
    // -----------------------------------------------------------------------

    /// Assert DC low (command mode) and send one command byte.
    fn send_command(&mut self, cmd: Command) -> Result<(), DisplayError<PinE>> {
        self.dc.set_low().map_err(DisplayError::Gpio)?;
        self.spi
            .write(&[cmd as u8])
            .map_err(|_| DisplayError::Communication)
    }

    /// Assert DC high (data mode) and send bytes, at most
    /// [`MAX_TRANSFER`] per write.
    fn send_data(&mut self, data: &[u8]) -> Result<(), DisplayError<PinE>> {
        if data.is_empty() {
            return Ok(());
        }
        self.dc.set_high().map_err(DisplayError::Gpio)?;
        for chunk in data.chunks(MAX_TRANSFER) {
            self.spi
                .write(chunk)
                .map_err(|_| DisplayError::Communication)?;
        }
        Ok(())
    }

    /// Send one command followed by its data bytes.
    fn cmd_data(&mut self, cmd: Command, data: &[u8]) -> Result<(), DisplayError<PinE>> {
        self.send_command(cmd)?;
        self.send_data(data)
    }

    /// Send a palette-coded frame as controller codes.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), DisplayError<PinE>> {
        self.send_command(Command::DataStartTransmission)?;
        let mut wire = Vec::with_capacity(MAX_TRANSFER.min(frame.len()));
        self.dc.set_high().map_err(DisplayError::Gpio)?;
        for chunk in frame.chunks(MAX_TRANSFER) {
            wire.clear();
            wire.extend(chunk.iter().map(|&b| wire_byte(b)));
            self.spi
                .write(&wire)
                .map_err(|_| DisplayError::Communication)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // BUSY polling
    // -----------------------------------------------------------------------

    /// Block until BUSY goes HIGH (controller idle) or the budget runs out.
    fn wait_busy(&mut self) -> Result<(), DisplayError<PinE>> {
        let polls = (self.busy_timeout_ms / BUSY_POLL_MS).max(1);
        for _ in 0..polls {
            let idle = self.busy.is_high().map_err(DisplayError::Gpio)?;
            if idle {
                return Ok(());
            }
            self.delay.delay_ms(BUSY_POLL_MS);
        }
        tracing::warn!(timeout_ms = self.busy_timeout_ms, "BUSY wait timed out");
        Err(DisplayError::Timeout)
    }

    // -----------------------------------------------------------------------
    // Reset / power
    // -----------------------------------------------------------------------

    /// Hardware reset sequence.
    ///
    /// RST HIGH 20 ms → LOW 2 ms → HIGH 20 ms.
    fn hardware_reset(&mut self) -> Result<(), DisplayError<PinE>> {
        self.rst.set_high().map_err(DisplayError::Gpio)?;
        self.delay.delay_ms(20);
        self.rst.set_low().map_err(DisplayError::Gpio)?;
        self.delay.delay_ms(2);
        self.rst.set_high().map_err(DisplayError::Gpio)?;
        self.delay.delay_ms(20);
        Ok(())
    }

    /// Power on, refresh from RAM, power off.
    fn turn_on_display(&mut self) -> Result<(), DisplayError<PinE>> {
        self.send_command(Command::PowerOn)?;
        self.wait_busy()?;

        self.cmd_data(Command::BoosterSoftStart2, &[0x6F, 0x1F, 0x17, 0x49])?;

        self.cmd_data(Command::DisplayRefresh, &[0x00])?;
        self.wait_busy()?;

        self.cmd_data(Command::PowerOff, &[0x00])?;
        self.wait_busy()
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Reset the controller and load the register configuration.
    pub fn init(&mut self) -> Result<(), DisplayError<PinE>> {
        self.hardware_reset()?;
        self.wait_busy()?;
        self.delay.delay_ms(30);

        for &(cmd, data) in INIT_SEQUENCE {
            self.cmd_data(cmd, data)?;
        }

        self.send_command(Command::PowerOn)?;
        self.wait_busy()?;
        tracing::debug!("controller initialised");
        Ok(())
    }

    /// Fill the panel with palette `color` and refresh.
    pub fn clear(&mut self, color: u8) -> Result<(), DisplayError<PinE>> {
        self.send_command(Command::DataStartTransmission)?;
        let fill = wire_byte(packed(color));
        let chunk = vec![fill; MAX_TRANSFER];
        self.dc.set_high().map_err(DisplayError::Gpio)?;
        let mut remaining = FRAMEBUFFER_SIZE;
        while remaining > 0 {
            let len = remaining.min(MAX_TRANSFER);
            let part = chunk.get(..len).ok_or(DisplayError::InvalidBuffer)?;
            self.spi
                .write(part)
                .map_err(|_| DisplayError::Communication)?;
            remaining = remaining.saturating_sub(len);
        }
        self.turn_on_display()
    }

    /// Send a packed palette frame of exactly [`FRAMEBUFFER_SIZE`] bytes and
    /// refresh.
    pub fn display(&mut self, frame: &[u8]) -> Result<(), DisplayError<PinE>> {
        if frame.len() != FRAMEBUFFER_SIZE {
            return Err(DisplayError::InvalidBuffer);
        }
        self.send_frame(frame)?;
        self.turn_on_display()
    }

    /// Six vertical color bars.
    pub fn show_test_pattern(&mut self) -> Result<(), DisplayError<PinE>> {
        let bar = ROW_BYTES / PATTERN_COLORS.len();
        let mut row = Vec::with_capacity(ROW_BYTES);
        for color in PATTERN_COLORS {
            row.extend(core::iter::repeat(packed(color)).take(bar));
        }
        // Columns left over after six equal bars stay white.
        row.resize(ROW_BYTES, packed(WHITE));

        let frame: Vec<u8> = row
            .iter()
            .copied()
            .cycle()
            .take(FRAMEBUFFER_SIZE)
            .collect();
        self.send_frame(&frame)?;
        self.turn_on_display()
    }

    /// Six horizontal color bands.
    pub fn show_block_pattern(&mut self) -> Result<(), DisplayError<PinE>> {
        let band = FRAMEBUFFER_SIZE / PATTERN_COLORS.len();
        let mut frame = Vec::with_capacity(FRAMEBUFFER_SIZE);
        for color in PATTERN_COLORS {
            frame.extend(core::iter::repeat(packed(color)).take(band));
        }
        frame.resize(FRAMEBUFFER_SIZE, packed(WHITE));
        self.send_frame(&frame)?;
        self.turn_on_display()
    }

    /// Power off and enter deep sleep. Only a reset ([`Self::init`]) wakes
    /// the controller.
    pub fn sleep(&mut self) -> Result<(), DisplayError<PinE>> {
        self.cmd_data(Command::PowerOff, &[0x00])?;
        self.wait_busy()?;
        self.cmd_data(Command::DeepSleep, &[0xA5])?;
        tracing::debug!("controller in deep sleep");
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    type TestDriver = Epd7in3e<SpiMock<u8>, PinMock, PinMock, PinMock, NoopDelay>;

    /// One `SpiDevice::write` as seen by the mock:
    /// TransactionStart + Write(data) + TransactionEnd.
    fn spi_device_write(data: &[u8]) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(data.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    /// Expected bus and DC traffic, built up step by step.
    #[derive(Default)]
    struct Expect {
        spi: Vec<SpiTransaction<u8>>,
        dc: Vec<PinTransaction>,
        busy: Vec<PinTransaction>,
    }

    impl Expect {
        fn cmd(&mut self, cmd: Command) -> &mut Self {
            self.dc.push(PinTransaction::set(PinState::Low));
            self.spi.extend(spi_device_write(&[cmd as u8]));
            self
        }

        fn data(&mut self, data: &[u8]) -> &mut Self {
            self.dc.push(PinTransaction::set(PinState::High));
            for chunk in data.chunks(MAX_TRANSFER) {
                self.spi.extend(spi_device_write(chunk));
            }
            self
        }

        fn idle(&mut self) -> &mut Self {
            self.busy.push(PinTransaction::get(PinState::High));
            self
        }

        fn turn_on(&mut self) -> &mut Self {
            self.cmd(Command::PowerOn).idle();
            self.cmd(Command::BoosterSoftStart2)
                .data(&[0x6F, 0x1F, 0x17, 0x49]);
            self.cmd(Command::DisplayRefresh).data(&[0x00]).idle();
            self.cmd(Command::PowerOff).data(&[0x00]).idle()
        }

        fn mocks(&self, rst: &[PinTransaction]) -> (SpiMock<u8>, PinMock, PinMock, PinMock) {
            (
                SpiMock::new(&self.spi),
                PinMock::new(&self.dc),
                PinMock::new(rst),
                PinMock::new(&self.busy),
            )
        }
    }

    fn driver(mocks: &(SpiMock<u8>, PinMock, PinMock, PinMock)) -> TestDriver {
        Epd7in3e::new(
            mocks.0.clone(),
            mocks.1.clone(),
            mocks.2.clone(),
            mocks.3.clone(),
            NoopDelay,
        )
    }

    fn done(mocks: &mut (SpiMock<u8>, PinMock, PinMock, PinMock)) {
        mocks.0.done();
        mocks.1.done();
        mocks.2.done();
        mocks.3.done();
    }

    // -----------------------------------------------------------------------
    // Wire translation
    // -----------------------------------------------------------------------

    #[test]
    fn test_wire_translation() {
        assert_eq!(wire_byte(0x00), 0x00, "black/black unchanged");
        assert_eq!(wire_byte(0x13), 0x13, "white/red unchanged");
        assert_eq!(wire_byte(0x44), 0x55, "blue is 5 on the wire");
        assert_eq!(wire_byte(0x55), 0x66, "green is 6 on the wire");
        assert_eq!(wire_byte(0x45), 0x56);
        assert_eq!(wire_byte(0x21), 0x21);
        assert_eq!(wire_byte(0xF9), 0xF9, "undefined nibbles pass through");
    }

    // -----------------------------------------------------------------------
    // Init sequence
    // -----------------------------------------------------------------------

    /// `init` emits reset, then the register table byte for byte, then
    /// POWER_ON.
    #[test]
    fn test_init_sequence() {
        let mut e = Expect::default();
        e.idle();
        e.cmd(Command::CommandHeader)
            .data(&[0x49, 0x55, 0x20, 0x08, 0x09, 0x18]);
        e.cmd(Command::PowerSetting).data(&[0x3F]);
        e.cmd(Command::PanelSetting).data(&[0x5F, 0x69]);
        e.cmd(Command::PowerOffSequence)
            .data(&[0x00, 0x54, 0x00, 0x44]);
        e.cmd(Command::BoosterSoftStart1)
            .data(&[0x40, 0x1F, 0x1F, 0x2C]);
        e.cmd(Command::BoosterSoftStart2)
            .data(&[0x6F, 0x1F, 0x17, 0x49]);
        e.cmd(Command::BoosterSoftStart3)
            .data(&[0x6F, 0x1F, 0x1F, 0x22]);
        e.cmd(Command::PllControl).data(&[0x03]);
        e.cmd(Command::VcomDataInterval).data(&[0x3F]);
        e.cmd(Command::TconSetting).data(&[0x02, 0x00]);
        e.cmd(Command::ResolutionSetting)
            .data(&[0x03, 0x20, 0x01, 0xE0]);
        e.cmd(Command::TVdcs).data(&[0x01]);
        e.cmd(Command::PowerSaving).data(&[0x2F]);
        e.cmd(Command::PowerOn).idle();

        let mut mocks = e.mocks(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut drv = driver(&mocks);
        drv.init().unwrap();
        done(&mut mocks);
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::DataStartTransmission as u8, 0x10);
        assert_eq!(Command::DisplayRefresh as u8, 0x12);
        assert_eq!(Command::DeepSleep as u8, 0x07);
        assert_eq!(Command::CommandHeader as u8, 0xAA);
        assert_eq!(INIT_SEQUENCE.len(), 13);
    }

    // -----------------------------------------------------------------------
    // BUSY
    // -----------------------------------------------------------------------

    /// BUSY stuck low: 30 ms budget is three polls, then `Timeout`.
    #[test]
    fn test_busy_timeout() {
        let mut mocks = (
            SpiMock::new(&[]),
            PinMock::new(&[]),
            PinMock::new(&[]),
            PinMock::new(&[
                PinTransaction::get(PinState::Low),
                PinTransaction::get(PinState::Low),
                PinTransaction::get(PinState::Low),
            ]),
        );
        let mut drv = driver(&mocks).with_busy_timeout(30);
        assert!(matches!(drv.wait_busy(), Err(DisplayError::Timeout)));
        done(&mut mocks);
    }

    /// BUSY low twice, then high: returns after the third poll.
    #[test]
    fn test_busy_released() {
        let mut mocks = (
            SpiMock::new(&[]),
            PinMock::new(&[]),
            PinMock::new(&[]),
            PinMock::new(&[
                PinTransaction::get(PinState::Low),
                PinTransaction::get(PinState::Low),
                PinTransaction::get(PinState::High),
            ]),
        );
        let mut drv = driver(&mocks);
        drv.wait_busy().unwrap();
        done(&mut mocks);
    }

    // -----------------------------------------------------------------------
    // Frame transfer
    // -----------------------------------------------------------------------

    #[test]
    fn test_display_rejects_wrong_size() {
        let mut mocks = Expect::default().mocks(&[]);
        let mut drv = driver(&mocks);
        assert!(matches!(
            drv.display(&vec![0x11; FRAMEBUFFER_SIZE - 1]),
            Err(DisplayError::InvalidBuffer)
        ));
        assert!(matches!(
            drv.display(&vec![0x11; FRAMEBUFFER_SIZE + 1]),
            Err(DisplayError::InvalidBuffer)
        ));
        done(&mut mocks);
    }

    /// Blue and green frames are translated and sent in 4096-byte chunks.
    #[test]
    fn test_display_translates_and_chunks() {
        let mut frame = vec![0x44u8; FRAMEBUFFER_SIZE];
        frame[0] = 0x45;
        frame[FRAMEBUFFER_SIZE - 1] = 0x13;

        let mut wire = vec![0x55u8; FRAMEBUFFER_SIZE];
        wire[0] = 0x56;
        wire[FRAMEBUFFER_SIZE - 1] = 0x13;

        let mut e = Expect::default();
        e.cmd(Command::DataStartTransmission).data(&wire);
        e.turn_on();
        // 192000 = 46 * 4096 + 3584
        assert_eq!(e.spi.len(), 3 * (1 + 47) + 3 * 7);

        let mut mocks = e.mocks(&[]);
        let mut drv = driver(&mocks);
        drv.display(&frame).unwrap();
        done(&mut mocks);
    }

    #[test]
    fn test_clear_fills_every_byte() {
        let mut e = Expect::default();
        e.cmd(Command::DataStartTransmission)
            .data(&vec![0x66; FRAMEBUFFER_SIZE]);
        e.turn_on();

        let mut mocks = e.mocks(&[]);
        let mut drv = driver(&mocks);
        drv.clear(GREEN).unwrap();
        done(&mut mocks);
    }

    #[test]
    fn test_block_pattern_bands() {
        let band = FRAMEBUFFER_SIZE / 6;
        let mut wire = Vec::new();
        for code in [0x00u8, 0x22, 0x33, 0x55, 0x66, 0x11] {
            wire.extend(std::iter::repeat(code).take(band));
        }

        let mut e = Expect::default();
        e.cmd(Command::DataStartTransmission).data(&wire);
        e.turn_on();

        let mut mocks = e.mocks(&[]);
        let mut drv = driver(&mocks);
        drv.show_block_pattern().unwrap();
        done(&mut mocks);
    }

    #[test]
    fn test_bar_pattern_rows() {
        // 400 bytes per row: six bars of 66 bytes, 4 white bytes left over.
        let mut row = Vec::new();
        for code in [0x00u8, 0x22, 0x33, 0x55, 0x66, 0x11] {
            row.extend(std::iter::repeat(code).take(66));
        }
        row.extend([0x11; 4]);
        assert_eq!(row.len(), ROW_BYTES);
        let wire: Vec<u8> = row.iter().copied().cycle().take(FRAMEBUFFER_SIZE).collect();

        let mut e = Expect::default();
        e.cmd(Command::DataStartTransmission).data(&wire);
        e.turn_on();

        let mut mocks = e.mocks(&[]);
        let mut drv = driver(&mocks);
        drv.show_test_pattern().unwrap();
        done(&mut mocks);
    }

    // -----------------------------------------------------------------------
    // Sleep
    // -----------------------------------------------------------------------

    /// `sleep()` emits POWER_OFF, waits for BUSY, then DEEP_SLEEP 0xA5.
    #[test]
    fn test_sleep_sequence() {
        let mut e = Expect::default();
        e.cmd(Command::PowerOff).data(&[0x00]).idle();
        e.cmd(Command::DeepSleep).data(&[0xA5]);

        let mut mocks = e.mocks(&[]);
        let mut drv = driver(&mocks);
        drv.sleep().unwrap();
        done(&mut mocks);
    }

    #[test]
    fn test_release_returns_peripherals() {
        let mocks = Expect::default().mocks(&[]);
        let drv = driver(&mocks);
        let (mut spi, mut dc, mut rst, mut busy, _delay) = drv.release();
        spi.done();
        dc.done();
        rst.done();
        busy.done();
    }
}
