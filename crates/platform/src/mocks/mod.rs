//! Mock implementations for testing
//!
//! In-memory stand-ins for every hardware seam of this crate:
//!
//! - [`SimBackend`]: a GPIO chip with a fixed set of lines
//! - [`SimSpi`] / [`SimSpiOpener`]: an SPI device that records each write
//!   together with the DC level at the time of the write
//! - [`NoDelay`]: a delay that returns immediately
//! - [`MockPanel`]: a [`PanelProtocol`] that records calls and can be told
//!   to fail
//!
//! All mocks are cheap handles over shared state: keep a clone in the test
//! to inspect what the code under test did.

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use thiserror::Error;

use crate::display::{DisplayInfo, PanelProtocol};
use crate::gpio::{Direction, LineBackend, PinId, PinState};
use crate::peripheral::SpiOpener;

fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// GPIO
// ---------------------------------------------------------------------------

/// Backend call recorded by [`SimBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioEvent {
    /// `export(pin)`
    Export(PinId),
    /// `unexport(pin)`
    Unexport(PinId),
    /// `set_direction(pin, direction)`
    Direction(PinId, Direction),
    /// `write(pin, state)`
    Write(PinId, PinState),
}

/// Failures produced by [`SimBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// The chip has no such line.
    #[error("no such line: GPIO{0}")]
    NoSuchLine(PinId),
    /// The line is already exported, possibly by another registry.
    #[error("GPIO{0} is already exported")]
    AlreadyExported(PinId),
    /// The line was used without being exported.
    #[error("GPIO{0} is not exported")]
    NotExported(PinId),
    /// Injected with [`SimBackend::fail_direction`].
    #[error("direction change rejected on GPIO{0}")]
    DirectionRejected(PinId),
}

#[derive(Debug, Clone, Copy)]
struct SimLine {
    exported: bool,
    direction: Direction,
    level: PinState,
}

#[derive(Debug, Default)]
struct SimChip {
    lines: BTreeMap<PinId, SimLine>,
    failing_directions: BTreeSet<PinId>,
    events: Vec<GpioEvent>,
}

impl SimChip {
    fn exported_line(&mut self, pin: PinId) -> Result<&mut SimLine, SimError> {
        let line = self.lines.get_mut(&pin).ok_or(SimError::NoSuchLine(pin))?;
        if !line.exported {
            return Err(SimError::NotExported(pin));
        }
        Ok(line)
    }
}

/// Simulated GPIO chip.
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    chip: Arc<Mutex<SimChip>>,
}

impl SimBackend {
    /// Chip exposing exactly `pins`, all low inputs.
    pub fn with_lines(pins: impl IntoIterator<Item = PinId>) -> Self {
        let lines = pins
            .into_iter()
            .map(|pin| {
                (
                    pin,
                    SimLine {
                        exported: false,
                        direction: Direction::Input,
                        level: PinState::Low,
                    },
                )
            })
            .collect();
        Self {
            chip: Arc::new(Mutex::new(SimChip {
                lines,
                ..SimChip::default()
            })),
        }
    }

    /// Set the level seen by the host on `pin` (e.g. a BUSY signal).
    pub fn set_level(&self, pin: PinId, state: PinState) {
        if let Some(line) = lock(&self.chip).lines.get_mut(&pin) {
            line.level = state;
        }
    }

    /// Current level of `pin`.
    pub fn level(&self, pin: PinId) -> Option<PinState> {
        lock(&self.chip).lines.get(&pin).map(|line| line.level)
    }

    /// Current direction of `pin`.
    pub fn direction(&self, pin: PinId) -> Option<Direction> {
        lock(&self.chip).lines.get(&pin).map(|line| line.direction)
    }

    /// Whether `pin` is exported.
    pub fn is_exported(&self, pin: PinId) -> bool {
        lock(&self.chip)
            .lines
            .get(&pin)
            .is_some_and(|line| line.exported)
    }

    /// Make every later direction change on `pin` fail.
    pub fn fail_direction(&self, pin: PinId) {
        lock(&self.chip).failing_directions.insert(pin);
    }

    /// Every backend call so far, in order.
    pub fn events(&self) -> Vec<GpioEvent> {
        lock(&self.chip).events.clone()
    }

    /// Levels written to `pin`, in order.
    pub fn writes(&self, pin: PinId) -> Vec<PinState> {
        lock(&self.chip)
            .events
            .iter()
            .filter_map(|event| match *event {
                GpioEvent::Write(p, state) if p == pin => Some(state),
                _ => None,
            })
            .collect()
    }
}

impl LineBackend for SimBackend {
    type Error = SimError;

    fn export(&mut self, pin: PinId) -> Result<(), SimError> {
        let mut chip = lock(&self.chip);
        let line = chip.lines.get_mut(&pin).ok_or(SimError::NoSuchLine(pin))?;
        if line.exported {
            return Err(SimError::AlreadyExported(pin));
        }
        line.exported = true;
        chip.events.push(GpioEvent::Export(pin));
        Ok(())
    }

    fn unexport(&mut self, pin: PinId) -> Result<(), SimError> {
        let mut chip = lock(&self.chip);
        let line = chip.exported_line(pin)?;
        line.exported = false;
        line.direction = Direction::Input;
        chip.events.push(GpioEvent::Unexport(pin));
        Ok(())
    }

    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), SimError> {
        let mut chip = lock(&self.chip);
        if chip.failing_directions.contains(&pin) {
            return Err(SimError::DirectionRejected(pin));
        }
        chip.exported_line(pin)?.direction = direction;
        chip.events.push(GpioEvent::Direction(pin, direction));
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> Result<PinState, SimError> {
        lock(&self.chip).exported_line(pin).map(|line| line.level)
    }

    fn write(&mut self, pin: PinId, state: PinState) -> Result<(), SimError> {
        let mut chip = lock(&self.chip);
        chip.exported_line(pin)?.level = state;
        chip.events.push(GpioEvent::Write(pin, state));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SPI
// ---------------------------------------------------------------------------

/// One recorded SPI write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiFrame {
    /// DC level during the write (`Low` = command, `High` = data)
    pub dc: PinState,
    /// Bytes clocked out
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct SpiLog {
    frames: Vec<SpiFrame>,
}

/// Recording SPI device.
///
/// Attached to a [`SimBackend`] so each write can be tagged with the DC
/// level, which is how the panel tells commands from data.
#[derive(Debug, Clone)]
pub struct SimSpi {
    chip: SimBackend,
    dc: PinId,
    log: Arc<Mutex<SpiLog>>,
}

impl SimSpi {
    /// Device whose writes are tagged with the level of `dc` on `chip`.
    pub fn attached(chip: SimBackend, dc: PinId) -> Self {
        Self {
            chip,
            dc,
            log: Arc::default(),
        }
    }

    /// Every write so far, in order.
    pub fn frames(&self) -> Vec<SpiFrame> {
        lock(&self.log).frames.clone()
    }

    /// Command bytes sent so far, in order.
    pub fn commands(&self) -> Vec<u8> {
        lock(&self.log)
            .frames
            .iter()
            .filter(|frame| frame.dc == PinState::Low)
            .flat_map(|frame| frame.bytes.iter().copied())
            .collect()
    }

    /// All data bytes that followed the most recent occurrence of `command`,
    /// concatenated across chunked writes.
    pub fn data_after(&self, command: u8) -> Option<Vec<u8>> {
        let log = lock(&self.log);
        let start = log
            .frames
            .iter()
            .rposition(|frame| frame.dc == PinState::Low && frame.bytes == [command])?;
        Some(
            log.frames
                .iter()
                .skip(start.saturating_add(1))
                .take_while(|frame| frame.dc == PinState::High)
                .flat_map(|frame| frame.bytes.iter().copied())
                .collect(),
        )
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        lock(&self.log).frames.clear();
    }

    fn record(&self, bytes: &[u8]) {
        let dc = self.chip.level(self.dc).unwrap_or(PinState::Low);
        lock(&self.log).frames.push(SpiFrame {
            dc,
            bytes: bytes.to_vec(),
        });
    }
}

impl ErrorType for SimSpi {
    type Error = Infallible;
}

impl SpiDevice for SimSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.record(bytes),
                Operation::Transfer(read, write) => {
                    self.record(write);
                    read.fill(0);
                }
                Operation::TransferInPlace(bytes) => {
                    self.record(bytes);
                    bytes.fill(0);
                }
                Operation::Read(bytes) => bytes.fill(0),
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

/// Failure injected into [`SimSpiOpener`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("simulated SPI device unavailable")]
pub struct SpiUnavailable;

/// [`SpiOpener`] handing out clones of one [`SimSpi`].
#[derive(Debug, Clone)]
pub struct SimSpiOpener {
    spi: SimSpi,
    state: Arc<Mutex<OpenerState>>,
}

#[derive(Debug, Default)]
struct OpenerState {
    opens: usize,
    fail: bool,
}

impl SimSpiOpener {
    /// Opener for `spi`.
    pub fn new(spi: SimSpi) -> Self {
        Self {
            spi,
            state: Arc::default(),
        }
    }

    /// Make later `open` calls fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        lock(&self.state).opens
    }
}

impl SpiOpener for SimSpiOpener {
    type Spi = SimSpi;
    type Error = SpiUnavailable;

    fn open(&mut self) -> Result<SimSpi, SpiUnavailable> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(SpiUnavailable);
        }
        state.opens = state.opens.saturating_add(1);
        Ok(self.spi.clone())
    }
}

/// Delay that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ---------------------------------------------------------------------------
// Panel protocol
// ---------------------------------------------------------------------------

/// Call recorded by [`MockPanel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelCall {
    /// `module_init`
    ModuleInit,
    /// `module_exit`
    ModuleExit,
    /// `panel_init`
    PanelInit,
    /// `panel_clear(color)`
    Clear(u8),
    /// `panel_show`
    Show,
    /// `panel_show_block`
    ShowBlock,
    /// `panel_display`, with the buffer length
    Display(usize),
    /// `panel_sleep`
    Sleep,
}

/// Failure injected into [`MockPanel`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("injected failure in {0:?}")]
pub struct MockPanelError(pub PanelCall);

#[derive(Debug, Default)]
struct MockPanelState {
    calls: Vec<PanelCall>,
    fail_module_init: bool,
    fail_panel_init: bool,
    fail_module_exit: bool,
    fail_commands: bool,
}

/// Recording [`PanelProtocol`] with failure injection.
#[derive(Debug, Clone)]
pub struct MockPanel {
    info: DisplayInfo,
    state: Arc<Mutex<MockPanelState>>,
}

impl MockPanel {
    /// Mock panel of the given geometry.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            info: DisplayInfo { width, height },
            state: Arc::default(),
        }
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<PanelCall> {
        lock(&self.state).calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Make `module_init` fail.
    pub fn fail_module_init(&self, fail: bool) {
        lock(&self.state).fail_module_init = fail;
    }

    /// Make `panel_init` fail.
    pub fn fail_panel_init(&self, fail: bool) {
        lock(&self.state).fail_panel_init = fail;
    }

    /// Make `module_exit` fail.
    pub fn fail_module_exit(&self, fail: bool) {
        lock(&self.state).fail_module_exit = fail;
    }

    /// Make every panel command (clear, show, display, sleep) fail.
    pub fn fail_commands(&self, fail: bool) {
        lock(&self.state).fail_commands = fail;
    }

    fn record(&self, call: PanelCall) -> Result<(), MockPanelError> {
        let mut state = lock(&self.state);
        let fail = match call {
            PanelCall::ModuleInit => state.fail_module_init,
            PanelCall::PanelInit => state.fail_panel_init,
            PanelCall::ModuleExit => state.fail_module_exit,
            _ => state.fail_commands,
        };
        state.calls.push(call.clone());
        if fail {
            return Err(MockPanelError(call));
        }
        Ok(())
    }
}

impl PanelProtocol for MockPanel {
    type Error = MockPanelError;

    fn info(&self) -> DisplayInfo {
        self.info
    }

    fn module_init(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCall::ModuleInit)
    }

    fn module_exit(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCall::ModuleExit)
    }

    fn panel_init(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCall::PanelInit)
    }

    fn panel_clear(&mut self, color: u8) -> Result<(), Self::Error> {
        self.record(PanelCall::Clear(color))
    }

    fn panel_show(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCall::Show)
    }

    fn panel_show_block(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCall::ShowBlock)
    }

    fn panel_display(&mut self, packed: &[u8]) -> Result<(), Self::Error> {
        self.record(PanelCall::Display(packed.len()))
    }

    fn panel_sleep(&mut self) -> Result<(), Self::Error> {
        self.record(PanelCall::Sleep)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_spi_tags_frames_with_dc_level() {
        let chip = SimBackend::with_lines([25]);
        let mut backend = chip.clone();
        backend.export(25).unwrap();
        let mut spi = SimSpi::attached(chip.clone(), 25);

        backend.write(25, PinState::Low).unwrap();
        spi.write(&[0x10]).unwrap();
        backend.write(25, PinState::High).unwrap();
        spi.write(&[0x11, 0x22]).unwrap();
        spi.write(&[0x33]).unwrap();

        assert_eq!(spi.commands(), vec![0x10]);
        assert_eq!(spi.data_after(0x10), Some(vec![0x11, 0x22, 0x33]));
        assert_eq!(spi.data_after(0x12), None);
    }

    #[test]
    fn test_sim_backend_requires_export() {
        let mut chip = SimBackend::with_lines([4]);
        assert_eq!(chip.read(4), Err(SimError::NotExported(4)));
        assert_eq!(chip.export(5), Err(SimError::NoSuchLine(5)));
    }

    #[test]
    fn test_sim_backend_export_is_exclusive() {
        let mut chip = SimBackend::with_lines([4]);
        chip.export(4).unwrap();
        assert_eq!(chip.export(4), Err(SimError::AlreadyExported(4)));
        chip.unexport(4).unwrap();
        chip.export(4).unwrap();
    }

    #[test]
    fn test_mock_panel_records_and_fails() {
        let mut panel = MockPanel::new(8, 2);
        panel.panel_clear(1).unwrap();
        panel.fail_commands(true);
        assert_eq!(
            panel.panel_sleep(),
            Err(MockPanelError(PanelCall::Sleep))
        );
        assert_eq!(panel.calls(), vec![PanelCall::Clear(1), PanelCall::Sleep]);
        assert_eq!(panel.info(), DisplayInfo { width: 8, height: 2 });
    }

    #[test]
    fn test_sim_spi_opener_failure() {
        let chip = SimBackend::with_lines([25]);
        let mut opener = SimSpiOpener::new(SimSpi::attached(chip, 25));
        opener.set_failing(true);
        assert!(opener.open().is_err());
        opener.set_failing(false);
        assert!(opener.open().is_ok());
        assert_eq!(opener.open_count(), 1);
    }
}
