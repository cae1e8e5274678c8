//! Panel protocol abstraction layer

/// Vendor panel protocol boundary.
///
/// The lifecycle controller talks to the panel only through this trait.
/// Implementors own whatever hardware handles the protocol needs (GPIO
/// lines, SPI device) between `module_init` and `module_exit`.
///
/// Colors are passed as palette codes (`0..=5`); the implementor maps them
/// to whatever the controller expects on the wire.
pub trait PanelProtocol {
    /// Error type for protocol operations
    ///
    /// Callers walk its [`source`](std::error::Error::source) chain to find
    /// an underlying [`GpioError`](crate::GpioError).
    type Error: std::error::Error + 'static;

    /// Panel geometry
    fn info(&self) -> DisplayInfo;

    /// Acquire GPIO lines, open the bus and power the module.
    fn module_init(&mut self) -> Result<(), Self::Error>;

    /// Drive the control lines low, close the bus and release every line.
    fn module_exit(&mut self) -> Result<(), Self::Error>;

    /// Reset the controller and load its register configuration.
    fn panel_init(&mut self) -> Result<(), Self::Error>;

    /// Fill the whole panel with one palette color and refresh.
    fn panel_clear(&mut self, color: u8) -> Result<(), Self::Error>;

    /// Show the built-in color-bar test pattern.
    fn panel_show(&mut self) -> Result<(), Self::Error>;

    /// Show the built-in color-block test pattern.
    fn panel_show_block(&mut self) -> Result<(), Self::Error>;

    /// Transmit a packed 4bpp frame and refresh.
    fn panel_display(&mut self, packed: &[u8]) -> Result<(), Self::Error>;

    /// Power down and enter deep sleep.
    fn panel_sleep(&mut self) -> Result<(), Self::Error>;
}

/// Panel geometry reported by a [`PanelProtocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}
