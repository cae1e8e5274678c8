//! Device lifecycle
//!
//! ```text
//!                 initialize()
//!  Uninitialized ──────────────→ Ready
//!        ↑                         │
//!        └─────── shutdown() ──────┘
//! ```
//!
//! Every hardware-facing call checks the state first and fails with
//! [`EpdError::NotInitialized`] without touching the vendor layer when the
//! device is not ready. `initialize` and `shutdown` are idempotent.
//!
//! The device is driven through `&mut self`; wrap it in a `Mutex` to share
//! it between threads.

use platform::PanelProtocol;

use crate::error::{find_gpio_cause, EpdError, InitStage};
use crate::framebuffer::{buffer_size, validate_for_display, FrameBuffer};
use crate::palette::Color;
use crate::panel::{protocol_error, Panel};

/// Lifecycle state of a [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No hardware held; only pure operations are allowed.
    Uninitialized,
    /// Brought up; panel commands are accepted.
    Ready,
}

/// One physical panel behind a vendor protocol.
pub struct Device<P: PanelProtocol> {
    protocol: P,
    state: DeviceState,
}

fn init_failed<E>(stage: InitStage, error: &E) -> EpdError
where
    E: std::error::Error + 'static,
{
    EpdError::InitializationFailed {
        stage,
        reason: error.to_string(),
        cause: find_gpio_cause(error),
    }
}

impl<P: PanelProtocol> Device<P> {
    /// Wrap a protocol implementation. Nothing is touched until
    /// [`Device::initialize`].
    pub fn new(protocol: P) -> Self {
        Self {
            protocol,
            state: DeviceState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Whether panel commands are accepted.
    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Ready
    }

    /// The wrapped protocol implementation.
    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    /// Bring the hardware up: module init, then panel init.
    ///
    /// A no-op when already ready. On failure the device stays
    /// uninitialized and the call may be retried.
    pub fn initialize(&mut self) -> Result<(), EpdError> {
        if self.is_ready() {
            tracing::debug!("initialize: already ready");
            return Ok(());
        }
        tracing::info!("initializing panel");

        self.protocol.module_init().map_err(|e| {
            let err = init_failed(InitStage::ModuleInit, &e);
            tracing::warn!(error = %err, "bring-up failed");
            err
        })?;

        if let Err(e) = self.protocol.panel_init() {
            let err = init_failed(InitStage::PanelInit, &e);
            tracing::warn!(error = %err, "bring-up failed");
            if let Err(exit) = self.protocol.module_exit() {
                tracing::warn!(error = %exit, "module exit after failed panel init");
            }
            return Err(err);
        }

        self.state = DeviceState::Ready;
        let info = self.protocol.info();
        tracing::info!(width = info.width, height = info.height, "panel ready");
        Ok(())
    }

    /// Release the hardware.
    ///
    /// A no-op when not ready. The device is uninitialized afterwards even
    /// if the vendor layer reports an error.
    pub fn shutdown(&mut self) -> Result<(), EpdError> {
        if !self.is_ready() {
            tracing::debug!("shutdown: not initialized");
            return Ok(());
        }
        let result = self.protocol.module_exit();
        self.state = DeviceState::Uninitialized;
        tracing::info!("panel shut down");
        result.map_err(|e| protocol_error("shutdown", &e))
    }

    /// Command facade, available only while ready.
    pub fn panel(&mut self) -> Result<Panel<'_, P>, EpdError> {
        if !self.is_ready() {
            tracing::warn!("panel command rejected: device not initialized");
            return Err(EpdError::NotInitialized);
        }
        Ok(Panel::new(&mut self.protocol))
    }

    /// Panel width in pixels.
    pub fn width(&self) -> u32 {
        self.protocol.info().width
    }

    /// Panel height in pixels.
    pub fn height(&self) -> u32 {
        self.protocol.info().height
    }

    /// Bytes in one full frame.
    pub fn buffer_size(&self) -> usize {
        buffer_size(self.width(), self.height())
    }

    /// Frame sized for this panel, filled with `fill`.
    pub fn allocate_buffer(&self, fill: Color) -> Result<FrameBuffer, EpdError> {
        FrameBuffer::new(self.width(), self.height(), fill)
    }

    /// Check `packed` against the live panel geometry.
    pub fn validate_buffer(&self, packed: &[u8]) -> Result<(), EpdError> {
        if !self.is_ready() {
            tracing::warn!("buffer validation rejected: device not initialized");
            return Err(EpdError::NotInitialized);
        }
        validate_for_display(packed, self.buffer_size())
    }

    /// See [`Panel::clear`].
    pub fn clear(&mut self, color: Color) -> Result<(), EpdError> {
        self.panel()?.clear(color)
    }

    /// See [`Panel::display`].
    pub fn display(&mut self, frame: &FrameBuffer) -> Result<(), EpdError> {
        self.panel()?.display(frame)
    }

    /// See [`Panel::display_bytes`].
    pub fn display_bytes(&mut self, packed: &[u8]) -> Result<(), EpdError> {
        self.panel()?.display_bytes(packed)
    }

    /// See [`Panel::show_test_pattern`].
    pub fn show_test_pattern(&mut self) -> Result<(), EpdError> {
        self.panel()?.show_test_pattern()
    }

    /// See [`Panel::show_block_pattern`].
    pub fn show_block_pattern(&mut self) -> Result<(), EpdError> {
        self.panel()?.show_block_pattern()
    }

    /// See [`Panel::sleep`].
    pub fn sleep(&mut self) -> Result<(), EpdError> {
        self.panel()?.sleep()
    }
}

impl<P: PanelProtocol> Drop for Device<P> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "shutdown on drop failed");
        }
    }
}

impl<P: PanelProtocol> core::fmt::Debug for Device<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("state", &self.state)
            .field("info", &self.protocol.info())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use platform::mocks::{MockPanel, PanelCall};

    fn device() -> (MockPanel, Device<MockPanel>) {
        let panel = MockPanel::new(800, 480);
        (panel.clone(), Device::new(panel))
    }

    #[test]
    fn test_commands_before_initialize_are_rejected() {
        let (panel, mut device) = device();
        let frame = FrameBuffer::new(800, 480, Color::White).unwrap();

        assert_eq!(device.clear(Color::White), Err(EpdError::NotInitialized));
        assert_eq!(device.display(&frame), Err(EpdError::NotInitialized));
        assert_eq!(
            device.display_bytes(frame.as_bytes()),
            Err(EpdError::NotInitialized)
        );
        assert_eq!(device.show_test_pattern(), Err(EpdError::NotInitialized));
        assert_eq!(device.show_block_pattern(), Err(EpdError::NotInitialized));
        assert_eq!(device.sleep(), Err(EpdError::NotInitialized));
        assert_eq!(
            device.validate_buffer(frame.as_bytes()),
            Err(EpdError::NotInitialized)
        );
        assert!(device.panel().is_err());

        assert!(
            panel.calls().is_empty(),
            "no vendor call may happen before initialize: {:?}",
            panel.calls()
        );
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (panel, mut device) = device();
        device.initialize().unwrap();
        device.initialize().unwrap();
        assert!(device.is_ready());
        assert_eq!(
            panel.calls(),
            vec![PanelCall::ModuleInit, PanelCall::PanelInit]
        );
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (panel, mut device) = device();
        device.shutdown().unwrap();
        assert!(panel.calls().is_empty(), "shutdown while uninitialized is a no-op");

        device.initialize().unwrap();
        device.shutdown().unwrap();
        device.shutdown().unwrap();
        assert_eq!(device.state(), DeviceState::Uninitialized);
        assert_eq!(
            panel.calls(),
            vec![
                PanelCall::ModuleInit,
                PanelCall::PanelInit,
                PanelCall::ModuleExit
            ]
        );
    }

    #[test]
    fn test_module_init_failure_leaves_device_uninitialized() {
        let (panel, mut device) = device();
        panel.fail_module_init(true);

        let err = device.initialize().unwrap_err();
        assert!(matches!(
            err,
            EpdError::InitializationFailed {
                stage: InitStage::ModuleInit,
                cause: None,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::InitializationFailed);
        assert!(!device.is_ready());
        assert_eq!(panel.calls(), vec![PanelCall::ModuleInit]);

        panel.fail_module_init(false);
        device.initialize().unwrap();
        assert!(device.is_ready(), "retry after failure must succeed");
    }

    #[test]
    fn test_panel_init_failure_exits_module() {
        let (panel, mut device) = device();
        panel.fail_panel_init(true);

        let err = device.initialize().unwrap_err();
        assert!(matches!(
            err,
            EpdError::InitializationFailed {
                stage: InitStage::PanelInit,
                ..
            }
        ));
        assert!(!device.is_ready());
        assert_eq!(
            panel.calls(),
            vec![
                PanelCall::ModuleInit,
                PanelCall::PanelInit,
                PanelCall::ModuleExit
            ]
        );

        panel.fail_panel_init(false);
        panel.clear_calls();
        device.initialize().unwrap();
        assert_eq!(
            panel.calls(),
            vec![PanelCall::ModuleInit, PanelCall::PanelInit]
        );
    }

    #[test]
    fn test_failing_module_exit_still_uninitializes() {
        let (panel, mut device) = device();
        device.initialize().unwrap();
        panel.fail_module_exit(true);

        let err = device.shutdown().unwrap_err();
        assert!(matches!(
            err,
            EpdError::Panel {
                operation: "shutdown",
                ..
            }
        ));
        assert_eq!(device.state(), DeviceState::Uninitialized);
        assert_eq!(device.clear(Color::Red), Err(EpdError::NotInitialized));
    }

    #[test]
    fn test_display_scenario() {
        let (panel, mut device) = device();
        assert_eq!(device.buffer_size(), 192_000);
        let frame = device.allocate_buffer(Color::White).unwrap();

        device.initialize().unwrap();
        device.display(&frame).unwrap();
        device.validate_buffer(frame.as_bytes()).unwrap();

        assert_eq!(
            panel.calls().last(),
            Some(&PanelCall::Display(192_000))
        );
    }

    #[test]
    fn test_wrong_size_never_reaches_vendor() {
        let (panel, mut device) = device();
        device.initialize().unwrap();
        panel.clear_calls();

        let short = vec![0x11; 191_999];
        let long = vec![0x11; 192_001];
        assert_eq!(
            device.display_bytes(&short),
            Err(EpdError::BufferSizeMismatch {
                expected: 192_000,
                actual: 191_999
            })
        );
        assert!(device.display_bytes(&long).is_err());
        assert!(device.validate_buffer(&long).is_err());

        let small = FrameBuffer::new(10, 10, Color::White).unwrap();
        assert!(matches!(
            device.display(&small),
            Err(EpdError::BufferSizeMismatch { .. })
        ));
        assert!(panel.calls().is_empty());
    }

    #[test]
    fn test_commands_forward_once_ready() {
        let (panel, mut device) = device();
        device.initialize().unwrap();
        panel.clear_calls();

        device.clear(Color::Blue).unwrap();
        device.show_test_pattern().unwrap();
        device.show_block_pattern().unwrap();
        device.sleep().unwrap();

        assert_eq!(
            panel.calls(),
            vec![
                PanelCall::Clear(4),
                PanelCall::Show,
                PanelCall::ShowBlock,
                PanelCall::Sleep
            ]
        );
        assert!(device.is_ready(), "sleep does not end the ready state");
    }

    #[test]
    fn test_vendor_failure_is_panel_error() {
        let (panel, mut device) = device();
        device.initialize().unwrap();
        panel.fail_commands(true);

        let err = device.clear(Color::Black).unwrap_err();
        assert!(matches!(err, EpdError::Panel { operation: "clear", .. }));
        assert_eq!(err.kind(), ErrorKind::Hardware);
        assert!(device.is_ready());
    }

    #[test]
    fn test_panel_facade_geometry() {
        let (_panel, mut device) = device();
        device.initialize().unwrap();
        let panel = device.panel().unwrap();
        assert_eq!((panel.width(), panel.height()), (800, 480));
        assert_eq!(panel.buffer_size(), 192_000);
    }

    #[test]
    fn test_drop_shuts_down_ready_device() {
        let (panel, mut device) = device();
        device.initialize().unwrap();
        drop(device);
        assert_eq!(panel.calls().last(), Some(&PanelCall::ModuleExit));
    }
}
