//! Display drivers for the Waveshare 7.3" (E) panel
//!
//! [`driver`] speaks the controller protocol over `embedded-hal` traits;
//! [`module`] brings up the GPIO lines and SPI device around it and exposes
//! the result as a [`platform::PanelProtocol`].

pub mod driver;
pub mod module;

pub use driver::{DisplayError, Epd7in3e, BLACK, BLUE, GREEN, RED, WHITE, YELLOW};
pub use module::{ModuleError, PanelModule};

#[cfg(feature = "linux")]
pub use module::LinuxPanelModule;

/// Display specification for the Waveshare 7.3" (E)
pub const WAVESHARE_7_3_E_SPEC: eink_specs::DisplaySpec = eink_specs::displays::WAVESHARE_7_3_E;

/// Display width in pixels
pub const DISPLAY_WIDTH: u32 = WAVESHARE_7_3_E_SPEC.width;

/// Display height in pixels
pub const DISPLAY_HEIGHT: u32 = WAVESHARE_7_3_E_SPEC.height;

/// Bits per pixel in the controller's frame memory
pub const BITS_PER_PIXEL: u8 = WAVESHARE_7_3_E_SPEC.color_mode.bits_per_pixel();

/// Frame size in bytes (800×480 at 4 bits per pixel = 192,000 bytes)
#[allow(clippy::arithmetic_side_effects)] // 800 * 4 / 8 * 480, evaluated at compile time
pub const FRAMEBUFFER_SIZE: usize =
    (DISPLAY_WIDTH as usize * BITS_PER_PIXEL as usize).div_ceil(8) * DISPLAY_HEIGHT as usize;

// The packed codec stores one palette index per nibble.
const _: () = assert!(BITS_PER_PIXEL == 4);
const _: () = assert!(
    crate::palette::Color::ALL.len() == WAVESHARE_7_3_E_SPEC.color_mode.palette_size() as usize
);
