//! Panel command facade
//!
//! A [`Panel`] is only handed out by [`Device::panel`](crate::Device::panel)
//! while the device is ready, so holding one is proof that bring-up
//! succeeded. Each command checks its arguments and forwards to the vendor
//! protocol.

use platform::{DisplayInfo, PanelProtocol};

use crate::error::{find_gpio_cause, EpdError};
use crate::framebuffer::{buffer_size, validate_for_display, FrameBuffer};
use crate::palette::Color;

/// Map a vendor-layer failure onto [`EpdError`].
///
/// A GPIO failure anywhere in the source chain is reported as
/// [`EpdError::Gpio`]; anything else as [`EpdError::Panel`].
pub(crate) fn protocol_error<E>(operation: &'static str, error: &E) -> EpdError
where
    E: std::error::Error + 'static,
{
    tracing::warn!(operation, error = %error, "panel command failed");
    match find_gpio_cause(error) {
        Some(gpio) => EpdError::Gpio(gpio),
        None => EpdError::Panel {
            operation,
            reason: error.to_string(),
        },
    }
}

/// Commands for a ready panel.
pub struct Panel<'a, P: PanelProtocol> {
    protocol: &'a mut P,
    info: DisplayInfo,
}

impl<'a, P: PanelProtocol> Panel<'a, P> {
    pub(crate) fn new(protocol: &'a mut P) -> Self {
        let info = protocol.info();
        Self { protocol, info }
    }

    /// Panel width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Panel height in pixels.
    pub fn height(&self) -> u32 {
        self.info.height
    }

    /// Bytes in one full frame.
    pub fn buffer_size(&self) -> usize {
        buffer_size(self.info.width, self.info.height)
    }

    /// Fill the whole panel with one color.
    pub fn clear(&mut self, color: Color) -> Result<(), EpdError> {
        tracing::debug!(%color, "clear");
        self.protocol
            .panel_clear(color.index())
            .map_err(|e| protocol_error("clear", &e))
    }

    /// Send a frame and refresh.
    pub fn display(&mut self, frame: &FrameBuffer) -> Result<(), EpdError> {
        self.display_bytes(frame.as_bytes())
    }

    /// Send packed bytes and refresh.
    ///
    /// The slice must be exactly [`Panel::buffer_size`] bytes long.
    pub fn display_bytes(&mut self, packed: &[u8]) -> Result<(), EpdError> {
        if let Err(e) = validate_for_display(packed, self.buffer_size()) {
            tracing::warn!(error = %e, "display rejected");
            return Err(e);
        }
        tracing::debug!(bytes = packed.len(), "display");
        self.protocol
            .panel_display(packed)
            .map_err(|e| protocol_error("display", &e))
    }

    /// Show the vertical color-bar test pattern.
    pub fn show_test_pattern(&mut self) -> Result<(), EpdError> {
        self.protocol
            .panel_show()
            .map_err(|e| protocol_error("show test pattern", &e))
    }

    /// Show the horizontal color-block test pattern.
    pub fn show_block_pattern(&mut self) -> Result<(), EpdError> {
        self.protocol
            .panel_show_block()
            .map_err(|e| protocol_error("show block pattern", &e))
    }

    /// Put the panel into deep sleep.
    ///
    /// The device stays ready and keeps its lines; the controller needs
    /// another bring-up before it accepts a frame.
    pub fn sleep(&mut self) -> Result<(), EpdError> {
        self.protocol
            .panel_sleep()
            .map_err(|e| protocol_error("sleep", &e))
    }
}
